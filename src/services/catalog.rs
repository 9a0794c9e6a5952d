//! catalog.rs
//!
//! Справочники планетария: темы, купола, программы (astronomy shows).
//! Запись доступна только администраторам, проверка прав в контроллерах.

use serde::{Deserialize, Serialize};
use sqlx::{PgConnection, PgPool, Postgres, QueryBuilder, Row};
use std::collections::HashMap;
use validator::Validate;

use crate::error::ApiError;
use crate::models::{AstronomyShow, PlanetariumDome, ShowTheme};

#[derive(Debug, Deserialize, Validate)]
pub struct ThemePayload {
    #[validate(length(min = 1, max = 255))]
    pub name: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct DomePayload {
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    #[validate(range(min = 1, message = "rows must be a positive number"))]
    pub rows: i32,
    #[validate(range(min = 1, message = "seats_in_row must be a positive number"))]
    pub seats_in_row: i32,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ShowPayload {
    #[validate(length(min = 1, max = 255))]
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub show_themes: Vec<i64>,
}

/// Фильтры списка программ. Serialize нужен для ключа кеша.
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct ShowFilters {
    pub title: Option<String>,
    pub show_themes: Option<String>,
}

impl ShowFilters {
    /// `show_themes=1,2,3` -> [1, 2, 3]
    pub fn theme_ids(&self) -> Result<Option<Vec<i64>>, ApiError> {
        let Some(raw) = self.show_themes.as_deref().filter(|s| !s.trim().is_empty()) else {
            return Ok(None);
        };
        raw.split(',')
            .map(|part| part.trim().parse::<i64>())
            .collect::<Result<Vec<_>, _>>()
            .map(Some)
            .map_err(|_| ApiError::field("show_themes", "show_themes must be a comma separated list of ids"))
    }

    pub fn title(&self) -> Option<&str> {
        self.title.as_deref().filter(|t| !t.is_empty())
    }
}

// Экранируем спецсимволы LIKE, чтобы поиск был по подстроке
pub fn escape_like(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

#[derive(Clone)]
pub struct CatalogService {
    pool: PgPool,
}

impl CatalogService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /* ---------- THEMES ---------- */

    pub async fn list_themes(&self) -> Result<Vec<ShowTheme>, ApiError> {
        let themes = sqlx::query_as::<_, ShowTheme>("SELECT id, name FROM show_themes ORDER BY id")
            .fetch_all(&self.pool)
            .await?;
        Ok(themes)
    }

    pub async fn get_theme(&self, id: i64) -> Result<Option<ShowTheme>, ApiError> {
        let theme = sqlx::query_as::<_, ShowTheme>("SELECT id, name FROM show_themes WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(theme)
    }

    pub async fn create_theme(&self, payload: &ThemePayload) -> Result<ShowTheme, ApiError> {
        let theme = sqlx::query_as::<_, ShowTheme>(
            "INSERT INTO show_themes (name) VALUES ($1) RETURNING id, name"
        )
        .bind(&payload.name)
        .fetch_one(&self.pool)
        .await?;
        Ok(theme)
    }

    pub async fn update_theme(&self, id: i64, payload: &ThemePayload) -> Result<Option<ShowTheme>, ApiError> {
        let theme = sqlx::query_as::<_, ShowTheme>(
            "UPDATE show_themes SET name = $2 WHERE id = $1 RETURNING id, name"
        )
        .bind(id)
        .bind(&payload.name)
        .fetch_optional(&self.pool)
        .await?;
        Ok(theme)
    }

    /* ---------- DOMES ---------- */

    pub async fn list_domes(&self) -> Result<Vec<PlanetariumDome>, ApiError> {
        let domes = sqlx::query_as::<_, PlanetariumDome>(
            "SELECT id, name, rows, seats_in_row FROM planetarium_domes ORDER BY id"
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(domes)
    }

    pub async fn get_dome(&self, id: i64) -> Result<Option<PlanetariumDome>, ApiError> {
        let dome = sqlx::query_as::<_, PlanetariumDome>(
            "SELECT id, name, rows, seats_in_row FROM planetarium_domes WHERE id = $1"
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(dome)
    }

    pub async fn create_dome(&self, payload: &DomePayload) -> Result<PlanetariumDome, ApiError> {
        let dome = sqlx::query_as::<_, PlanetariumDome>(
            "INSERT INTO planetarium_domes (name, rows, seats_in_row)
             VALUES ($1, $2, $3)
             RETURNING id, name, rows, seats_in_row"
        )
        .bind(&payload.name)
        .bind(payload.rows)
        .bind(payload.seats_in_row)
        .fetch_one(&self.pool)
        .await?;
        Ok(dome)
    }

    // Уже проданные билеты за пределами новой сетки не трогаем
    pub async fn update_dome(&self, id: i64, payload: &DomePayload) -> Result<Option<PlanetariumDome>, ApiError> {
        let dome = sqlx::query_as::<_, PlanetariumDome>(
            "UPDATE planetarium_domes SET name = $2, rows = $3, seats_in_row = $4
             WHERE id = $1
             RETURNING id, name, rows, seats_in_row"
        )
        .bind(id)
        .bind(&payload.name)
        .bind(payload.rows)
        .bind(payload.seats_in_row)
        .fetch_optional(&self.pool)
        .await?;
        Ok(dome)
    }

    /* ---------- SHOWS ---------- */

    pub async fn list_shows(&self, filters: &ShowFilters) -> Result<Vec<(AstronomyShow, Vec<ShowTheme>)>, ApiError> {
        let theme_ids = filters.theme_ids()?;

        let mut qb = QueryBuilder::<Postgres>::new(
            "SELECT DISTINCT s.id, s.title, s.description, s.image
             FROM astronomy_shows s
             LEFT JOIN astronomy_show_themes ast ON ast.astronomy_show_id = s.id
             WHERE TRUE"
        );
        if let Some(title) = filters.title() {
            qb.push(" AND s.title ILIKE ")
                .push_bind(format!("%{}%", escape_like(title)));
        }
        if let Some(ids) = theme_ids {
            qb.push(" AND ast.show_theme_id = ANY(").push_bind(ids).push(")");
        }
        qb.push(" ORDER BY s.title, s.id");

        let shows = qb
            .build_query_as::<AstronomyShow>()
            .fetch_all(&self.pool)
            .await?;

        let ids: Vec<i64> = shows.iter().map(|s| s.id).collect();
        let mut themes = load_show_themes(&self.pool, &ids).await?;

        Ok(shows
            .into_iter()
            .map(|show| {
                let show_themes = themes.remove(&show.id).unwrap_or_default();
                (show, show_themes)
            })
            .collect())
    }

    pub async fn get_show(&self, id: i64) -> Result<Option<(AstronomyShow, Vec<ShowTheme>)>, ApiError> {
        let show = sqlx::query_as::<_, AstronomyShow>(
            "SELECT id, title, description, image FROM astronomy_shows WHERE id = $1"
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(show) = show else { return Ok(None) };
        let mut themes = load_show_themes(&self.pool, &[show.id]).await?;
        let show_themes = themes.remove(&show.id).unwrap_or_default();
        Ok(Some((show, show_themes)))
    }

    pub async fn create_show(&self, payload: &ShowPayload) -> Result<(AstronomyShow, Vec<ShowTheme>), ApiError> {
        let mut tx = self.pool.begin().await?;

        let show = sqlx::query_as::<_, AstronomyShow>(
            "INSERT INTO astronomy_shows (title, description)
             VALUES ($1, $2)
             RETURNING id, title, description, image"
        )
        .bind(&payload.title)
        .bind(&payload.description)
        .fetch_one(&mut *tx)
        .await?;

        let themes = replace_show_themes(&mut tx, show.id, &payload.show_themes).await?;
        tx.commit().await?;

        Ok((show, themes))
    }

    pub async fn update_show(
        &self,
        id: i64,
        payload: &ShowPayload,
    ) -> Result<Option<(AstronomyShow, Vec<ShowTheme>)>, ApiError> {
        let mut tx = self.pool.begin().await?;

        let show = sqlx::query_as::<_, AstronomyShow>(
            "UPDATE astronomy_shows SET title = $2, description = $3
             WHERE id = $1
             RETURNING id, title, description, image"
        )
        .bind(id)
        .bind(&payload.title)
        .bind(&payload.description)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(show) = show else { return Ok(None) };
        let themes = replace_show_themes(&mut tx, show.id, &payload.show_themes).await?;
        tx.commit().await?;

        Ok(Some((show, themes)))
    }

    pub async fn set_show_image(&self, id: i64, image: &str) -> Result<Option<AstronomyShow>, ApiError> {
        let show = sqlx::query_as::<_, AstronomyShow>(
            "UPDATE astronomy_shows SET image = $2 WHERE id = $1
             RETURNING id, title, description, image"
        )
        .bind(id)
        .bind(image)
        .fetch_optional(&self.pool)
        .await?;
        Ok(show)
    }
}

/// Темы для набора программ, сгруппированные по id программы.
pub async fn load_show_themes(
    pool: &PgPool,
    show_ids: &[i64],
) -> Result<HashMap<i64, Vec<ShowTheme>>, sqlx::Error> {
    if show_ids.is_empty() {
        return Ok(HashMap::new());
    }

    let rows = sqlx::query(
        r#"
        SELECT ast.astronomy_show_id, t.id, t.name
        FROM astronomy_show_themes ast
        JOIN show_themes t ON t.id = ast.show_theme_id
        WHERE ast.astronomy_show_id = ANY($1)
        ORDER BY t.id
        "#
    )
    .bind(show_ids)
    .fetch_all(pool)
    .await?;

    let mut grouped: HashMap<i64, Vec<ShowTheme>> = HashMap::new();
    for r in rows {
        let show_id: i64 = r.get("astronomy_show_id");
        grouped.entry(show_id).or_default().push(ShowTheme {
            id: r.get("id"),
            name: r.get("name"),
        });
    }
    Ok(grouped)
}

// Полностью заменяет набор тем программы. Несуществующий id темы -> 400.
async fn replace_show_themes(
    conn: &mut PgConnection,
    show_id: i64,
    theme_ids: &[i64],
) -> Result<Vec<ShowTheme>, ApiError> {
    let mut ids = theme_ids.to_vec();
    ids.sort_unstable();
    ids.dedup();

    let themes = sqlx::query_as::<_, ShowTheme>(
        "SELECT id, name FROM show_themes WHERE id = ANY($1) ORDER BY id"
    )
    .bind(&ids)
    .fetch_all(&mut *conn)
    .await?;

    if let Some(missing) = ids.iter().find(|id| !themes.iter().any(|t| t.id == **id)) {
        return Err(ApiError::field(
            "show_themes",
            format!("Invalid pk \"{}\" - object does not exist.", missing),
        ));
    }

    sqlx::query("DELETE FROM astronomy_show_themes WHERE astronomy_show_id = $1")
        .bind(show_id)
        .execute(&mut *conn)
        .await?;

    if !ids.is_empty() {
        sqlx::query(
            "INSERT INTO astronomy_show_themes (astronomy_show_id, show_theme_id)
             SELECT $1, UNNEST($2::BIGINT[])"
        )
        .bind(show_id)
        .bind(&ids)
        .execute(&mut *conn)
        .await?;
    }

    Ok(themes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_theme_id_list() {
        let filters = ShowFilters { title: None, show_themes: Some("1, 2,3".into()) };
        assert_eq!(filters.theme_ids().unwrap(), Some(vec![1, 2, 3]));
    }

    #[test]
    fn rejects_non_numeric_theme_ids() {
        let filters = ShowFilters { title: None, show_themes: Some("1,mars".into()) };
        assert!(matches!(filters.theme_ids(), Err(ApiError::BadRequest(_))));
    }

    #[test]
    fn empty_filters_are_ignored() {
        let filters = ShowFilters { title: Some(String::new()), show_themes: Some(" ".into()) };
        assert_eq!(filters.theme_ids().unwrap(), None);
        assert_eq!(filters.title(), None);
    }

    #[test]
    fn like_wildcards_are_escaped() {
        assert_eq!(escape_like("100%_sky\\"), "100\\%\\_sky\\\\");
        assert_eq!(escape_like("Mars"), "Mars");
    }

    #[test]
    fn dome_payload_requires_positive_dimensions() {
        let payload = DomePayload { name: "East".into(), rows: 0, seats_in_row: 12 };
        let errors = payload.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("rows"));
        assert!(!errors.field_errors().contains_key("seats_in_row"));
    }
}

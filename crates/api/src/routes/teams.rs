//! Team management routes

use axum::{
    extract::{Extension, Path, Query, State},
    Json,
};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

use teamloom_shared::TeamRole;

use crate::{
    auth::CurrentUser,
    error::{ApiError, ApiResult},
    integrations::extract_owner_and_repo,
    response::Envelope,
    state::AppState,
};

// =============================================================================
// Request/Response Types
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct CreateTeamRequest {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct JoinTeamRequest {
    pub code: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManageMembersRequest {
    pub team_id: Uuid,
    pub action: String,
    pub member_id: Uuid,
    pub role: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddRepoRequest {
    pub team_id: Uuid,
    pub repo_url: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteRepoQuery {
    pub team_id: Uuid,
    pub repo_id: Uuid,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserBrief {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub full_name: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamMemberView {
    pub user: UserBrief,
    pub role: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamRepoView {
    pub id: Uuid,
    pub name: String,
    pub url: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamSummary {
    pub id: Uuid,
    pub name: String,
    pub code: String,
    pub owner: UserBrief,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamDetail {
    pub id: Uuid,
    pub name: String,
    pub code: String,
    pub owner: UserBrief,
    pub members: Vec<TeamMemberView>,
    pub github_repos: Vec<TeamRepoView>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamListData {
    pub teams: Vec<TeamSummary>,
    pub count: usize,
}

// =============================================================================
// Database Row Types
// =============================================================================

#[derive(Debug, FromRow)]
struct TeamWithOwnerRow {
    id: Uuid,
    name: String,
    code: String,
    owner_id: Uuid,
    owner_username: String,
    owner_email: String,
    owner_full_name: String,
    created_at: OffsetDateTime,
    updated_at: OffsetDateTime,
}

#[derive(Debug, FromRow)]
struct MemberRow {
    role: String,
    id: Uuid,
    username: String,
    email: String,
    full_name: String,
}

#[derive(Debug, FromRow)]
struct RepoRow {
    id: Uuid,
    name: String,
    url: String,
}

#[derive(Debug, FromRow)]
struct TeamOwnerRow {
    owner_id: Uuid,
}

impl TeamWithOwnerRow {
    fn into_summary(self) -> TeamSummary {
        TeamSummary {
            id: self.id,
            name: self.name,
            code: self.code,
            owner: UserBrief {
                id: self.owner_id,
                username: self.owner_username,
                email: self.owner_email,
                full_name: self.owner_full_name,
            },
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

// =============================================================================
// Handlers
// =============================================================================

/// Create a team; the creator becomes its owner and first member
pub async fn create_team(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Json(req): Json<CreateTeamRequest>,
) -> ApiResult<Envelope<TeamDetail>> {
    let name = req.name.trim();
    if name.is_empty() {
        return Err(ApiError::BadRequest("Team name is required".to_string()));
    }

    let code = generate_join_code();
    let team_id = Uuid::new_v4();

    let mut tx = state.pool.begin().await?;

    sqlx::query("INSERT INTO teams (id, name, code, owner_id) VALUES ($1, $2, $3, $4)")
        .bind(team_id)
        .bind(name)
        .bind(&code)
        .bind(user.id)
        .execute(&mut *tx)
        .await?;

    sqlx::query("INSERT INTO team_members (id, team_id, user_id, role) VALUES ($1, $2, $3, $4)")
        .bind(Uuid::new_v4())
        .bind(team_id)
        .bind(user.id)
        .bind(TeamRole::Owner.as_str())
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;

    tracing::info!(team_id = %team_id, owner_id = %user.id, "create_team: team created");

    let team = fetch_team_detail(&state.pool, team_id)
        .await?
        .ok_or(ApiError::Internal)?;
    Ok(Envelope::created(team, "Team created successfully"))
}

/// Join a team by its invite code
pub async fn join_team(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Json(req): Json<JoinTeamRequest>,
) -> ApiResult<Envelope<TeamDetail>> {
    let code = req.code.trim();
    if code.is_empty() {
        return Err(ApiError::BadRequest("Team code is required".to_string()));
    }

    let team: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM teams WHERE code = $1")
        .bind(code)
        .fetch_optional(&state.pool)
        .await?;
    let (team_id,) = team.ok_or_else(|| ApiError::NotFound("Team not found".to_string()))?;

    if is_member(&state.pool, team_id, user.id).await? {
        return Err(ApiError::BadRequest("Already a member".to_string()));
    }

    sqlx::query("INSERT INTO team_members (id, team_id, user_id, role) VALUES ($1, $2, $3, $4)")
        .bind(Uuid::new_v4())
        .bind(team_id)
        .bind(user.id)
        .bind(TeamRole::Member.as_str())
        .execute(&state.pool)
        .await?;

    let team = fetch_team_detail(&state.pool, team_id)
        .await?
        .ok_or(ApiError::Internal)?;
    Ok(Envelope::ok(team, "Joined team successfully"))
}

/// Add, remove, or re-role a member. Owner only.
pub async fn manage_members(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Json(req): Json<ManageMembersRequest>,
) -> ApiResult<Envelope<TeamDetail>> {
    let owner: Option<TeamOwnerRow> =
        sqlx::query_as("SELECT owner_id FROM teams WHERE id = $1")
            .bind(req.team_id)
            .fetch_optional(&state.pool)
            .await?;
    let owner = owner.ok_or_else(|| ApiError::NotFound("Team not found".to_string()))?;

    if owner.owner_id != user.id {
        return Err(ApiError::Forbidden);
    }

    let message = match req.action.as_str() {
        "add" => {
            if is_member(&state.pool, req.team_id, req.member_id).await? {
                return Err(ApiError::BadRequest("User already a member".to_string()));
            }
            sqlx::query(
                "INSERT INTO team_members (id, team_id, user_id, role) VALUES ($1, $2, $3, $4)",
            )
            .bind(Uuid::new_v4())
            .bind(req.team_id)
            .bind(req.member_id)
            .bind(req.role.as_deref().unwrap_or("member"))
            .execute(&state.pool)
            .await?;
            "Member added successfully"
        }
        "remove" => {
            sqlx::query("DELETE FROM team_members WHERE team_id = $1 AND user_id = $2")
                .bind(req.team_id)
                .bind(req.member_id)
                .execute(&state.pool)
                .await?;
            "Member removed successfully"
        }
        "updateRole" => {
            let role = req
                .role
                .ok_or_else(|| ApiError::BadRequest("Role is required".to_string()))?;
            let updated =
                sqlx::query("UPDATE team_members SET role = $1 WHERE team_id = $2 AND user_id = $3")
                    .bind(&role)
                    .bind(req.team_id)
                    .bind(req.member_id)
                    .execute(&state.pool)
                    .await?;
            if updated.rows_affected() == 0 {
                return Err(ApiError::NotFound("Member not found".to_string()));
            }
            "Member role updated successfully"
        }
        _ => return Err(ApiError::BadRequest("Invalid action".to_string())),
    };

    let team = fetch_team_detail(&state.pool, req.team_id)
        .await?
        .ok_or(ApiError::Internal)?;
    Ok(Envelope::ok(team, message))
}

/// List the teams the caller belongs to
pub async fn get_teams(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
) -> ApiResult<Envelope<TeamListData>> {
    let rows: Vec<TeamWithOwnerRow> = sqlx::query_as(
        r#"
        SELECT t.id, t.name, t.code, t.owner_id,
               u.username AS owner_username, u.email AS owner_email,
               u.full_name AS owner_full_name,
               t.created_at, t.updated_at
        FROM teams t
        JOIN team_members tm ON tm.team_id = t.id
        JOIN users u ON u.id = t.owner_id
        WHERE tm.user_id = $1
        ORDER BY t.created_at DESC
        "#,
    )
    .bind(user.id)
    .fetch_all(&state.pool)
    .await?;

    let teams: Vec<TeamSummary> = rows.into_iter().map(TeamWithOwnerRow::into_summary).collect();
    let count = teams.len();

    Ok(Envelope::ok(
        TeamListData { teams, count },
        "Teams fetched successfully",
    ))
}

/// Fetch one team with members and repositories
pub async fn get_team_details(
    State(state): State<AppState>,
    Path(team_id): Path<Uuid>,
) -> ApiResult<Envelope<TeamDetail>> {
    let team = fetch_team_detail(&state.pool, team_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Team not found".to_string()))?;
    Ok(Envelope::ok(team, "Team details fetched successfully"))
}

/// Delete a team. Owner only; membership and repo rows cascade.
pub async fn delete_team(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(team_id): Path<Uuid>,
) -> ApiResult<Envelope<serde_json::Value>> {
    let owner: Option<TeamOwnerRow> =
        sqlx::query_as("SELECT owner_id FROM teams WHERE id = $1")
            .bind(team_id)
            .fetch_optional(&state.pool)
            .await?;
    let owner = owner.ok_or_else(|| ApiError::NotFound("Team not found".to_string()))?;

    if owner.owner_id != user.id {
        return Err(ApiError::Forbidden);
    }

    sqlx::query("DELETE FROM teams WHERE id = $1")
        .bind(team_id)
        .execute(&state.pool)
        .await?;

    tracing::info!(team_id = %team_id, "delete_team: team removed");

    Ok(Envelope::ok(
        serde_json::json!({}),
        "Team deleted successfully",
    ))
}

/// Leave a team the caller belongs to
pub async fn leave_team(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(team_id): Path<Uuid>,
) -> ApiResult<Envelope<serde_json::Value>> {
    let team: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM teams WHERE id = $1")
        .bind(team_id)
        .fetch_optional(&state.pool)
        .await?;
    team.ok_or_else(|| ApiError::NotFound("Team not found".to_string()))?;

    let removed = sqlx::query("DELETE FROM team_members WHERE team_id = $1 AND user_id = $2")
        .bind(team_id)
        .bind(user.id)
        .execute(&state.pool)
        .await?;

    if removed.rows_affected() == 0 {
        return Err(ApiError::BadRequest(
            "You are not a member of this team".to_string(),
        ));
    }

    Ok(Envelope::ok(
        serde_json::json!({}),
        "You have successfully left the team",
    ))
}

/// Attach a GitHub repository to a team
pub async fn add_github_repo(
    State(state): State<AppState>,
    Json(req): Json<AddRepoRequest>,
) -> ApiResult<Envelope<TeamDetail>> {
    if req.repo_url.trim().is_empty() {
        return Err(ApiError::BadRequest(
            "Team ID and repository URL are required".to_string(),
        ));
    }

    let (_, repo_name) = extract_owner_and_repo(&req.repo_url)
        .map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let team: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM teams WHERE id = $1")
        .bind(req.team_id)
        .fetch_optional(&state.pool)
        .await?;
    team.ok_or_else(|| ApiError::NotFound("Team not found".to_string()))?;

    sqlx::query("INSERT INTO team_repos (id, team_id, name, url) VALUES ($1, $2, $3, $4)")
        .bind(Uuid::new_v4())
        .bind(req.team_id)
        .bind(&repo_name)
        .bind(req.repo_url.trim())
        .execute(&state.pool)
        .await?;

    let team = fetch_team_detail(&state.pool, req.team_id)
        .await?
        .ok_or(ApiError::Internal)?;
    Ok(Envelope::ok(team, "Repository added successfully"))
}

/// Detach a GitHub repository from a team
pub async fn delete_github_repo(
    State(state): State<AppState>,
    Query(query): Query<DeleteRepoQuery>,
) -> ApiResult<Envelope<TeamDetail>> {
    let team: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM teams WHERE id = $1")
        .bind(query.team_id)
        .fetch_optional(&state.pool)
        .await?;
    team.ok_or_else(|| ApiError::NotFound("Team not found".to_string()))?;

    let removed = sqlx::query("DELETE FROM team_repos WHERE id = $1 AND team_id = $2")
        .bind(query.repo_id)
        .bind(query.team_id)
        .execute(&state.pool)
        .await?;

    if removed.rows_affected() == 0 {
        return Err(ApiError::NotFound("Repository not found".to_string()));
    }

    let team = fetch_team_detail(&state.pool, query.team_id)
        .await?
        .ok_or(ApiError::Internal)?;
    Ok(Envelope::ok(team, "Repository deleted successfully"))
}

// =============================================================================
// Helpers
// =============================================================================

/// 6 random bytes, hex-encoded, as the shareable join code
fn generate_join_code() -> String {
    let mut bytes = [0u8; 6];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

async fn is_member(pool: &PgPool, team_id: Uuid, user_id: Uuid) -> ApiResult<bool> {
    let exists: Option<(bool,)> = sqlx::query_as(
        "SELECT EXISTS(SELECT 1 FROM team_members WHERE team_id = $1 AND user_id = $2)",
    )
    .bind(team_id)
    .bind(user_id)
    .fetch_optional(pool)
    .await?;
    Ok(exists.map(|r| r.0).unwrap_or(false))
}

/// Assemble a team with its owner, members, and repositories
async fn fetch_team_detail(pool: &PgPool, team_id: Uuid) -> ApiResult<Option<TeamDetail>> {
    let team: Option<TeamWithOwnerRow> = sqlx::query_as(
        r#"
        SELECT t.id, t.name, t.code, t.owner_id,
               u.username AS owner_username, u.email AS owner_email,
               u.full_name AS owner_full_name,
               t.created_at, t.updated_at
        FROM teams t
        JOIN users u ON u.id = t.owner_id
        WHERE t.id = $1
        "#,
    )
    .bind(team_id)
    .fetch_optional(pool)
    .await?;

    let Some(team) = team else {
        return Ok(None);
    };

    let members: Vec<MemberRow> = sqlx::query_as(
        r#"
        SELECT tm.role, u.id, u.username, u.email, u.full_name
        FROM team_members tm
        JOIN users u ON u.id = tm.user_id
        WHERE tm.team_id = $1
        ORDER BY tm.created_at
        "#,
    )
    .bind(team_id)
    .fetch_all(pool)
    .await?;

    let repos: Vec<RepoRow> =
        sqlx::query_as("SELECT id, name, url FROM team_repos WHERE team_id = $1 ORDER BY created_at")
            .bind(team_id)
            .fetch_all(pool)
            .await?;

    let summary = team.into_summary();
    Ok(Some(TeamDetail {
        id: summary.id,
        name: summary.name,
        code: summary.code,
        owner: summary.owner,
        members: members
            .into_iter()
            .map(|m| TeamMemberView {
                user: UserBrief {
                    id: m.id,
                    username: m.username,
                    email: m.email,
                    full_name: m.full_name,
                },
                role: m.role,
            })
            .collect(),
        github_repos: repos
            .into_iter()
            .map(|r| TeamRepoView {
                id: r.id,
                name: r.name,
                url: r.url,
            })
            .collect(),
        created_at: summary.created_at,
        updated_at: summary.updated_at,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_code_shape() {
        let code = generate_join_code();
        assert_eq!(code.len(), 12);
        assert!(code.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_join_codes_are_random() {
        assert_ne!(generate_join_code(), generate_join_code());
    }

    #[test]
    fn test_manage_members_request_camel_case() {
        let req: ManageMembersRequest = serde_json::from_str(&format!(
            r#"{{"teamId":"{}","action":"updateRole","memberId":"{}","role":"member"}}"#,
            Uuid::new_v4(),
            Uuid::new_v4(),
        ))
        .unwrap();
        assert_eq!(req.action, "updateRole");
        assert_eq!(req.role.as_deref(), Some("member"));
    }
}

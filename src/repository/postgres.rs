use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool, Postgres, query_builder::QueryBuilder};
use uuid::Uuid;

use super::{RepoResult, Repository, RepositoryError};
use crate::models::{
    Clinic, ClinicAdmin, ClinicalDocument, Configuration, ConfigurationChanges, Conversation,
    ConversationSummary, DocumentChanges, DocumentFilter, HealthWorker, Identity, LoginRecord,
    Message, MessageRole, NewClinic, NewClinicalDocument, NewUser, UniqueUserFields, User,
    UserChanges,
};

const USER_COLUMNS: &str = "u.id, u.clinic_id, u.ci, u.first_name, u.last_name, u.email, \
                            u.phone, u.address, u.date_of_birth, u.created_at";

const CLINIC_COLUMNS: &str = "id, name, email, phone, address, provider_name, created_at";

const CONFIGURATION_COLUMNS: &str = "id, clinic_id, portal_title, sidebar_text_color, \
     sidebar_background_color, background_color, icon_text_color, icon_background_color, \
     card_background_color, card_text_color, updated_at";

const DOCUMENT_COLUMNS: &str = "id, clinic_id, health_worker_id, health_user_ci, title, \
     description, document_type, content, s3_key, content_type, file_size, created_at, updated_at";

const CONVERSATION_COLUMNS: &str = "id, health_worker_id, health_user_ci, created_at, updated_at";

const MESSAGE_COLUMNS: &str = "id, conversation_id, role, content, created_at";

/// PostgresRepository
///
/// `Repository` backed by PostgreSQL. Queries are built at runtime with
/// `query_as::<_, T>` so the crate compiles without a live database.
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Unique-constraint violations become `Conflict`; everything else stays a
/// database error.
fn conflict_on_unique(message: &str) -> impl FnOnce(sqlx::Error) -> RepositoryError + '_ {
    move |err| match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            RepositoryError::Conflict(message.to_string())
        }
        _ => RepositoryError::Database(err),
    }
}

fn health_worker_select() -> String {
    format!(
        "SELECT hw.id AS health_worker_id, {USER_COLUMNS} \
         FROM health_workers hw JOIN users u ON u.id = hw.user_id"
    )
}

fn clinic_admin_select() -> String {
    format!(
        "SELECT ca.id AS clinic_admin_id, {USER_COLUMNS} \
         FROM clinic_admins ca JOIN users u ON u.id = ca.user_id"
    )
}

fn push_user_search(builder: &mut QueryBuilder<'_, Postgres>, search: Option<&str>) {
    let Some(search) = search.map(str::trim).filter(|s| !s.is_empty()) else {
        return;
    };
    let pattern = format!("%{search}%");
    builder.push(" AND (u.first_name ILIKE ");
    builder.push_bind(pattern.clone());
    builder.push(" OR u.last_name ILIKE ");
    builder.push_bind(pattern.clone());
    builder.push(" OR u.email ILIKE ");
    builder.push_bind(pattern.clone());
    builder.push(" OR u.ci ILIKE ");
    builder.push_bind(pattern.clone());
    builder.push(" OR u.phone ILIKE ");
    builder.push_bind(pattern);
    builder.push(")");
}

async fn insert_user<'e, E>(executor: E, user: &NewUser) -> Result<Uuid, sqlx::Error>
where
    E: sqlx::Executor<'e, Database = Postgres>,
{
    let id = Uuid::new_v4();
    sqlx::query(
        "INSERT INTO users (id, clinic_id, ci, first_name, last_name, email, phone, address, \
         date_of_birth, password_hash) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)",
    )
    .bind(id)
    .bind(user.clinic_id)
    .bind(&user.ci)
    .bind(&user.first_name)
    .bind(&user.last_name)
    .bind(&user.email)
    .bind(&user.phone)
    .bind(&user.address)
    .bind(user.date_of_birth)
    .bind(&user.password_hash)
    .execute(executor)
    .await?;
    Ok(id)
}

/// Row shape of the conversation listing: the conversation, the message count
/// and the (optional) newest message, flattened by the lateral join.
#[derive(FromRow)]
struct ConversationSummaryRow {
    #[sqlx(flatten)]
    conversation: Conversation,
    message_count: i64,
    last_message_id: Option<Uuid>,
    last_message_role: Option<MessageRole>,
    last_message_content: Option<String>,
    last_message_created_at: Option<DateTime<Utc>>,
}

impl From<ConversationSummaryRow> for ConversationSummary {
    fn from(row: ConversationSummaryRow) -> Self {
        let last_message = match (
            row.last_message_id,
            row.last_message_role,
            row.last_message_content,
            row.last_message_created_at,
        ) {
            (Some(id), Some(role), Some(content), Some(created_at)) => Some(Message {
                id,
                conversation_id: row.conversation.id,
                role,
                content,
                created_at,
            }),
            _ => None,
        };
        ConversationSummary {
            conversation: row.conversation,
            last_message,
            message_count: row.message_count,
        }
    }
}

#[async_trait]
impl Repository for PostgresRepository {
    async fn list_clinics(&self, provider_name: Option<&str>) -> RepoResult<Vec<Clinic>> {
        let mut builder: QueryBuilder<Postgres> =
            QueryBuilder::new(format!("SELECT {CLINIC_COLUMNS} FROM clinics WHERE true"));
        if let Some(provider) = provider_name.map(str::trim).filter(|p| !p.is_empty()) {
            builder.push(" AND provider_name ILIKE ");
            builder.push_bind(format!("%{provider}%"));
        }
        builder.push(" ORDER BY name ASC");

        Ok(builder
            .build_query_as::<Clinic>()
            .fetch_all(&self.pool)
            .await?)
    }

    async fn find_clinic_by_name(&self, name: &str) -> RepoResult<Option<Clinic>> {
        Ok(
            sqlx::query_as::<_, Clinic>(&format!(
                "SELECT {CLINIC_COLUMNS} FROM clinics WHERE name = $1"
            ))
            .bind(name)
            .fetch_optional(&self.pool)
            .await?,
        )
    }

    async fn create_clinic(
        &self,
        clinic: NewClinic,
        admin: NewUser,
    ) -> RepoResult<(Clinic, ClinicAdmin)> {
        let mut tx = self.pool.begin().await?;

        let created = sqlx::query_as::<_, Clinic>(&format!(
            "INSERT INTO clinics (id, name, email, phone, address, provider_name) \
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING {CLINIC_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(&clinic.name)
        .bind(&clinic.email)
        .bind(&clinic.phone)
        .bind(&clinic.address)
        .bind(&clinic.provider_name)
        .fetch_one(&mut *tx)
        .await
        .map_err(conflict_on_unique("a clinic with that name already exists"))?;

        let admin = NewUser {
            clinic_id: created.id,
            ..admin
        };
        let user_id = insert_user(&mut *tx, &admin)
            .await
            .map_err(conflict_on_unique("the administrator's identity is already in use"))?;
        let admin_id = Uuid::new_v4();
        sqlx::query("INSERT INTO clinic_admins (id, user_id) VALUES ($1, $2)")
            .bind(admin_id)
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        let defaults = Configuration::defaults_for(created.id);
        sqlx::query(
            "INSERT INTO configurations (id, clinic_id, portal_title, sidebar_text_color, \
             sidebar_background_color, background_color, icon_text_color, \
             icon_background_color, card_background_color, card_text_color) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)",
        )
        .bind(defaults.id)
        .bind(defaults.clinic_id)
        .bind(&defaults.portal_title)
        .bind(&defaults.sidebar_text_color)
        .bind(&defaults.sidebar_background_color)
        .bind(&defaults.background_color)
        .bind(&defaults.icon_text_color)
        .bind(&defaults.icon_background_color)
        .bind(&defaults.card_background_color)
        .bind(&defaults.card_text_color)
        .execute(&mut *tx)
        .await?;

        let clinic_admin = sqlx::query_as::<_, ClinicAdmin>(&format!(
            "{} WHERE ca.id = $1",
            clinic_admin_select()
        ))
        .bind(admin_id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok((created, clinic_admin))
    }

    async fn find_login(&self, clinic_id: Uuid, ci: &str) -> RepoResult<Option<LoginRecord>> {
        Ok(sqlx::query_as::<_, LoginRecord>(
            "SELECT id AS user_id, password_hash FROM users WHERE clinic_id = $1 AND ci = $2",
        )
        .bind(clinic_id)
        .bind(ci)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn load_identity(&self, user_id: Uuid) -> RepoResult<Option<Identity>> {
        let Some(user) =
            sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users u WHERE u.id = $1"))
                .bind(user_id)
                .fetch_optional(&self.pool)
                .await?
        else {
            return Ok(None);
        };

        let clinic = sqlx::query_as::<_, Clinic>(&format!(
            "SELECT {CLINIC_COLUMNS} FROM clinics WHERE id = $1"
        ))
        .bind(user.clinic_id)
        .fetch_one(&self.pool)
        .await?;

        let (health_worker_id, clinic_admin_id) = sqlx::query_as::<_, (Option<Uuid>, Option<Uuid>)>(
            "SELECT (SELECT id FROM health_workers WHERE user_id = $1), \
                    (SELECT id FROM clinic_admins WHERE user_id = $1)",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(Some(Identity {
            user,
            clinic,
            health_worker_id,
            clinic_admin_id,
        }))
    }

    async fn find_duplicate_user(
        &self,
        clinic_id: Uuid,
        fields: &UniqueUserFields,
        exclude_user: Option<Uuid>,
    ) -> RepoResult<Option<&'static str>> {
        let rows = sqlx::query_as::<_, (String, String, Option<String>)>(
            "SELECT email, ci, phone FROM users \
             WHERE clinic_id = $1 AND ($2::uuid IS NULL OR id <> $2) \
               AND (lower(email) = lower($3) OR ci = $4 OR phone = $5)",
        )
        .bind(clinic_id)
        .bind(exclude_user)
        .bind(&fields.email)
        .bind(&fields.ci)
        .bind(&fields.phone)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().find_map(|(email, ci, phone)| {
            super::first_collision(fields, email, ci, phone.as_deref())
        }))
    }

    async fn list_health_workers(
        &self,
        clinic_id: Uuid,
        search: Option<&str>,
    ) -> RepoResult<Vec<HealthWorker>> {
        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(health_worker_select());
        builder.push(" WHERE u.clinic_id = ");
        builder.push_bind(clinic_id);
        push_user_search(&mut builder, search);
        builder.push(" ORDER BY u.last_name ASC, u.first_name ASC");

        Ok(builder
            .build_query_as::<HealthWorker>()
            .fetch_all(&self.pool)
            .await?)
    }

    async fn get_health_worker(&self, id: Uuid) -> RepoResult<Option<HealthWorker>> {
        Ok(
            sqlx::query_as::<_, HealthWorker>(&format!("{} WHERE hw.id = $1", health_worker_select()))
                .bind(id)
                .fetch_optional(&self.pool)
                .await?,
        )
    }

    async fn find_health_worker_by_ci(
        &self,
        clinic_id: Uuid,
        ci: &str,
    ) -> RepoResult<Option<HealthWorker>> {
        Ok(sqlx::query_as::<_, HealthWorker>(&format!(
            "{} WHERE u.clinic_id = $1 AND u.ci = $2",
            health_worker_select()
        ))
        .bind(clinic_id)
        .bind(ci)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn create_health_worker(&self, user: NewUser) -> RepoResult<HealthWorker> {
        let mut tx = self.pool.begin().await?;
        let user_id = insert_user(&mut *tx, &user)
            .await
            .map_err(conflict_on_unique("a user with that email, CI or phone already exists"))?;
        let id = Uuid::new_v4();
        sqlx::query("INSERT INTO health_workers (id, user_id) VALUES ($1, $2)")
            .bind(id)
            .bind(user_id)
            .execute(&mut *tx)
            .await?;
        let worker =
            sqlx::query_as::<_, HealthWorker>(&format!("{} WHERE hw.id = $1", health_worker_select()))
                .bind(id)
                .fetch_one(&mut *tx)
                .await?;
        tx.commit().await?;
        Ok(worker)
    }

    async fn update_user(&self, user_id: Uuid, changes: &UserChanges) -> RepoResult<Option<User>> {
        Ok(sqlx::query_as::<_, User>(&format!(
            "UPDATE users u SET \
                ci = COALESCE($2, u.ci), \
                first_name = COALESCE($3, u.first_name), \
                last_name = COALESCE($4, u.last_name), \
                email = COALESCE($5, u.email), \
                phone = COALESCE($6, u.phone), \
                address = COALESCE($7, u.address), \
                date_of_birth = COALESCE($8, u.date_of_birth) \
             WHERE u.id = $1 RETURNING {USER_COLUMNS}"
        ))
        .bind(user_id)
        .bind(&changes.ci)
        .bind(&changes.first_name)
        .bind(&changes.last_name)
        .bind(&changes.email)
        .bind(&changes.phone)
        .bind(&changes.address)
        .bind(changes.date_of_birth)
        .fetch_optional(&self.pool)
        .await
        .map_err(conflict_on_unique("a user with that email, CI or phone already exists"))?)
    }

    async fn delete_user(&self, user_id: Uuid) -> RepoResult<bool> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_clinic_admins(
        &self,
        clinic_id: Uuid,
        search: Option<&str>,
    ) -> RepoResult<Vec<ClinicAdmin>> {
        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(clinic_admin_select());
        builder.push(" WHERE u.clinic_id = ");
        builder.push_bind(clinic_id);
        push_user_search(&mut builder, search);
        builder.push(" ORDER BY u.last_name ASC, u.first_name ASC");

        Ok(builder
            .build_query_as::<ClinicAdmin>()
            .fetch_all(&self.pool)
            .await?)
    }

    async fn get_clinic_admin(&self, id: Uuid) -> RepoResult<Option<ClinicAdmin>> {
        Ok(
            sqlx::query_as::<_, ClinicAdmin>(&format!("{} WHERE ca.id = $1", clinic_admin_select()))
                .bind(id)
                .fetch_optional(&self.pool)
                .await?,
        )
    }

    async fn create_clinic_admin(&self, user: NewUser) -> RepoResult<ClinicAdmin> {
        let mut tx = self.pool.begin().await?;
        let user_id = insert_user(&mut *tx, &user)
            .await
            .map_err(conflict_on_unique("a user with that email, CI or phone already exists"))?;
        let id = Uuid::new_v4();
        sqlx::query("INSERT INTO clinic_admins (id, user_id) VALUES ($1, $2)")
            .bind(id)
            .bind(user_id)
            .execute(&mut *tx)
            .await?;
        let admin =
            sqlx::query_as::<_, ClinicAdmin>(&format!("{} WHERE ca.id = $1", clinic_admin_select()))
                .bind(id)
                .fetch_one(&mut *tx)
                .await?;
        tx.commit().await?;
        Ok(admin)
    }

    async fn get_configuration(&self, clinic_id: Uuid) -> RepoResult<Option<Configuration>> {
        Ok(sqlx::query_as::<_, Configuration>(&format!(
            "SELECT {CONFIGURATION_COLUMNS} FROM configurations WHERE clinic_id = $1"
        ))
        .bind(clinic_id)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn update_configuration(
        &self,
        clinic_id: Uuid,
        changes: &ConfigurationChanges,
    ) -> RepoResult<Option<Configuration>> {
        Ok(sqlx::query_as::<_, Configuration>(&format!(
            "UPDATE configurations SET \
                portal_title = COALESCE($2, portal_title), \
                sidebar_text_color = COALESCE($3, sidebar_text_color), \
                sidebar_background_color = COALESCE($4, sidebar_background_color), \
                background_color = COALESCE($5, background_color), \
                icon_text_color = COALESCE($6, icon_text_color), \
                icon_background_color = COALESCE($7, icon_background_color), \
                card_background_color = COALESCE($8, card_background_color), \
                card_text_color = COALESCE($9, card_text_color), \
                updated_at = NOW() \
             WHERE clinic_id = $1 RETURNING {CONFIGURATION_COLUMNS}"
        ))
        .bind(clinic_id)
        .bind(&changes.portal_title)
        .bind(&changes.sidebar_text_color)
        .bind(&changes.sidebar_background_color)
        .bind(&changes.background_color)
        .bind(&changes.icon_text_color)
        .bind(&changes.icon_background_color)
        .bind(&changes.card_background_color)
        .bind(&changes.card_text_color)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn create_document(&self, document: NewClinicalDocument) -> RepoResult<ClinicalDocument> {
        Ok(sqlx::query_as::<_, ClinicalDocument>(&format!(
            "INSERT INTO clinical_documents (id, clinic_id, health_worker_id, health_user_ci, \
             title, description, document_type, content, s3_key, content_type, file_size) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11) RETURNING {DOCUMENT_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(document.clinic_id)
        .bind(document.health_worker_id)
        .bind(&document.health_user_ci)
        .bind(&document.title)
        .bind(&document.description)
        .bind(&document.document_type)
        .bind(&document.content)
        .bind(&document.s3_key)
        .bind(&document.content_type)
        .bind(document.file_size)
        .fetch_one(&self.pool)
        .await?)
    }

    async fn list_documents(
        &self,
        clinic_id: Uuid,
        filter: &DocumentFilter,
    ) -> RepoResult<Vec<ClinicalDocument>> {
        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(format!(
            "SELECT {DOCUMENT_COLUMNS} FROM clinical_documents WHERE clinic_id = "
        ));
        builder.push_bind(clinic_id);
        if let Some(ci) = &filter.health_user_ci {
            builder.push(" AND health_user_ci = ");
            builder.push_bind(ci.clone());
        }
        if let Some(document_type) = &filter.document_type {
            builder.push(" AND document_type = ");
            builder.push_bind(document_type.clone());
        }
        builder.push(" ORDER BY created_at DESC");

        Ok(builder
            .build_query_as::<ClinicalDocument>()
            .fetch_all(&self.pool)
            .await?)
    }

    async fn get_document(&self, id: Uuid) -> RepoResult<Option<ClinicalDocument>> {
        Ok(sqlx::query_as::<_, ClinicalDocument>(&format!(
            "SELECT {DOCUMENT_COLUMNS} FROM clinical_documents WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn update_document(
        &self,
        id: Uuid,
        changes: &DocumentChanges,
    ) -> RepoResult<Option<ClinicalDocument>> {
        Ok(sqlx::query_as::<_, ClinicalDocument>(&format!(
            "UPDATE clinical_documents SET \
                title = COALESCE($2, title), \
                description = COALESCE($3, description), \
                document_type = COALESCE($4, document_type), \
                content = COALESCE($5, content), \
                updated_at = NOW() \
             WHERE id = $1 RETURNING {DOCUMENT_COLUMNS}"
        ))
        .bind(id)
        .bind(&changes.title)
        .bind(&changes.description)
        .bind(&changes.document_type)
        .bind(&changes.content)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn delete_document(&self, id: Uuid) -> RepoResult<bool> {
        let result = sqlx::query("DELETE FROM clinical_documents WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn find_conversation(&self, id: Uuid) -> RepoResult<Option<Conversation>> {
        Ok(sqlx::query_as::<_, Conversation>(&format!(
            "SELECT {CONVERSATION_COLUMNS} FROM conversations WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn find_latest_conversation(
        &self,
        health_worker_id: Uuid,
        health_user_ci: &str,
    ) -> RepoResult<Option<Conversation>> {
        Ok(sqlx::query_as::<_, Conversation>(&format!(
            "SELECT {CONVERSATION_COLUMNS} FROM conversations \
             WHERE health_worker_id = $1 AND health_user_ci = $2 \
             ORDER BY updated_at DESC LIMIT 1"
        ))
        .bind(health_worker_id)
        .bind(health_user_ci)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn create_conversation(
        &self,
        health_worker_id: Uuid,
        health_user_ci: &str,
    ) -> RepoResult<Conversation> {
        Ok(sqlx::query_as::<_, Conversation>(&format!(
            "INSERT INTO conversations (id, health_worker_id, health_user_ci) \
             VALUES ($1, $2, $3) RETURNING {CONVERSATION_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(health_worker_id)
        .bind(health_user_ci)
        .fetch_one(&self.pool)
        .await?)
    }

    async fn list_messages(&self, conversation_id: Uuid) -> RepoResult<Vec<Message>> {
        Ok(sqlx::query_as::<_, Message>(&format!(
            "SELECT {MESSAGE_COLUMNS} FROM messages WHERE conversation_id = $1 \
             ORDER BY created_at ASC"
        ))
        .bind(conversation_id)
        .fetch_all(&self.pool)
        .await?)
    }

    async fn add_message(
        &self,
        conversation_id: Uuid,
        role: MessageRole,
        content: &str,
    ) -> RepoResult<Message> {
        let mut tx = self.pool.begin().await?;
        let message = sqlx::query_as::<_, Message>(&format!(
            "INSERT INTO messages (id, conversation_id, role, content) \
             VALUES ($1, $2, $3, $4) RETURNING {MESSAGE_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(conversation_id)
        .bind(role)
        .bind(content)
        .fetch_one(&mut *tx)
        .await?;
        sqlx::query("UPDATE conversations SET updated_at = NOW() WHERE id = $1")
            .bind(conversation_id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(message)
    }

    async fn list_conversations(
        &self,
        health_worker_id: Uuid,
        health_user_ci: Option<&str>,
    ) -> RepoResult<Vec<ConversationSummary>> {
        let rows = sqlx::query_as::<_, ConversationSummaryRow>(
            "SELECT c.id, c.health_worker_id, c.health_user_ci, c.created_at, c.updated_at, \
                    (SELECT COUNT(*) FROM messages m WHERE m.conversation_id = c.id) AS message_count, \
                    lm.id AS last_message_id, lm.role AS last_message_role, \
                    lm.content AS last_message_content, lm.created_at AS last_message_created_at \
             FROM conversations c \
             LEFT JOIN LATERAL ( \
                 SELECT id, role, content, created_at FROM messages \
                 WHERE conversation_id = c.id ORDER BY created_at DESC LIMIT 1 \
             ) lm ON true \
             WHERE c.health_worker_id = $1 AND ($2::text IS NULL OR c.health_user_ci = $2) \
             ORDER BY c.updated_at DESC",
        )
        .bind(health_worker_id)
        .bind(health_user_ci)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(ConversationSummary::from).collect())
    }

    async fn delete_conversation(&self, id: Uuid) -> RepoResult<bool> {
        let result = sqlx::query("DELETE FROM conversations WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

use async_trait::async_trait;
use chrono::Utc;
use std::sync::{Mutex, MutexGuard};
use uuid::Uuid;

use super::{RepoResult, Repository, RepositoryError, first_collision, matches_search};
use crate::models::{
    Clinic, ClinicAdmin, ClinicalDocument, Configuration, ConfigurationChanges, Conversation,
    ConversationSummary, DocumentChanges, DocumentFilter, HealthWorker, Identity, LoginRecord,
    Message, MessageRole, NewClinic, NewClinicalDocument, NewUser, UniqueUserFields, User,
    UserChanges,
};

struct StoredUser {
    user: User,
    password_hash: Option<String>,
}

/// Role markers: `(marker id, user id)`.
type Marker = (Uuid, Uuid);

#[derive(Default)]
struct Tables {
    clinics: Vec<Clinic>,
    configurations: Vec<Configuration>,
    users: Vec<StoredUser>,
    health_workers: Vec<Marker>,
    clinic_admins: Vec<Marker>,
    documents: Vec<ClinicalDocument>,
    conversations: Vec<Conversation>,
    messages: Vec<Message>,
}

impl Tables {
    fn user(&self, id: Uuid) -> Option<&User> {
        self.users.iter().map(|s| &s.user).find(|u| u.id == id)
    }

    fn health_worker(&self, marker: &Marker) -> Option<HealthWorker> {
        self.user(marker.1).map(|user| HealthWorker {
            id: marker.0,
            user: user.clone(),
        })
    }

    fn clinic_admin(&self, marker: &Marker) -> Option<ClinicAdmin> {
        self.user(marker.1).map(|user| ClinicAdmin {
            id: marker.0,
            user: user.clone(),
        })
    }

    /// Mirrors the unique constraints of the `users` table.
    fn check_unique(&self, clinic_id: Uuid, fields: &UniqueUserFields, exclude: Option<Uuid>) -> RepoResult<()> {
        let collides = self
            .users
            .iter()
            .map(|s| &s.user)
            .filter(|u| u.clinic_id == clinic_id && Some(u.id) != exclude)
            .any(|u| first_collision(fields, &u.email, &u.ci, u.phone.as_deref()).is_some());
        if collides {
            return Err(RepositoryError::Conflict(
                "a user with that email, CI or phone already exists".to_string(),
            ));
        }
        Ok(())
    }

    fn insert_user(&mut self, new: NewUser) -> RepoResult<Uuid> {
        let fields = UniqueUserFields {
            email: Some(new.email.clone()),
            ci: Some(new.ci.clone()),
            phone: new.phone.clone(),
        };
        self.check_unique(new.clinic_id, &fields, None)?;

        let id = Uuid::new_v4();
        self.users.push(StoredUser {
            user: User {
                id,
                clinic_id: new.clinic_id,
                ci: new.ci,
                first_name: new.first_name,
                last_name: new.last_name,
                email: new.email,
                phone: new.phone,
                address: new.address,
                date_of_birth: new.date_of_birth,
                created_at: Utc::now(),
            },
            password_hash: new.password_hash,
        });
        Ok(id)
    }

    fn remove_health_worker_rows(&mut self, health_worker_id: Uuid) {
        self.documents.retain(|d| d.health_worker_id != health_worker_id);
        let conversations: Vec<Uuid> = self
            .conversations
            .iter()
            .filter(|c| c.health_worker_id == health_worker_id)
            .map(|c| c.id)
            .collect();
        self.messages.retain(|m| !conversations.contains(&m.conversation_id));
        self.conversations.retain(|c| c.health_worker_id != health_worker_id);
    }
}

/// MemoryRepository
///
/// A `Repository` held entirely in memory, with the same uniqueness rules and
/// cascades as the SQL schema. Used by the HTTP integration tests.
#[derive(Default)]
pub struct MemoryRepository {
    tables: Mutex<Tables>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn tables(&self) -> MutexGuard<'_, Tables> {
        self.tables.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Grants a second role marker to an existing user. The schema allows it,
    /// the session layer must reject it.
    pub fn grant_health_worker_marker(&self, user_id: Uuid) -> Uuid {
        let id = Uuid::new_v4();
        self.tables().health_workers.push((id, user_id));
        id
    }
}

#[async_trait]
impl Repository for MemoryRepository {
    async fn list_clinics(&self, provider_name: Option<&str>) -> RepoResult<Vec<Clinic>> {
        let tables = self.tables();
        let mut clinics: Vec<Clinic> = tables
            .clinics
            .iter()
            .filter(|c| {
                provider_name
                    .is_none_or(|needle| matches_search(&[c.provider_name.as_deref()], needle))
            })
            .cloned()
            .collect();
        clinics.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(clinics)
    }

    async fn find_clinic_by_name(&self, name: &str) -> RepoResult<Option<Clinic>> {
        Ok(self.tables().clinics.iter().find(|c| c.name == name).cloned())
    }

    async fn create_clinic(
        &self,
        clinic: NewClinic,
        admin: NewUser,
    ) -> RepoResult<(Clinic, ClinicAdmin)> {
        let mut tables = self.tables();
        if tables.clinics.iter().any(|c| c.name == clinic.name) {
            return Err(RepositoryError::Conflict(
                "a clinic with that name already exists".to_string(),
            ));
        }

        let created = Clinic {
            id: Uuid::new_v4(),
            name: clinic.name,
            email: clinic.email,
            phone: clinic.phone,
            address: clinic.address,
            provider_name: clinic.provider_name,
            created_at: Utc::now(),
        };
        tables.clinics.push(created.clone());
        tables
            .configurations
            .push(Configuration::defaults_for(created.id));

        let user_id = tables.insert_user(NewUser {
            clinic_id: created.id,
            ..admin
        })?;
        let marker = (Uuid::new_v4(), user_id);
        tables.clinic_admins.push(marker);
        let clinic_admin = tables
            .clinic_admin(&marker)
            .ok_or_else(|| RepositoryError::Database(sqlx::Error::RowNotFound))?;

        Ok((created, clinic_admin))
    }

    async fn find_login(&self, clinic_id: Uuid, ci: &str) -> RepoResult<Option<LoginRecord>> {
        Ok(self
            .tables()
            .users
            .iter()
            .find(|s| s.user.clinic_id == clinic_id && s.user.ci == ci)
            .map(|s| LoginRecord {
                user_id: s.user.id,
                password_hash: s.password_hash.clone(),
            }))
    }

    async fn load_identity(&self, user_id: Uuid) -> RepoResult<Option<Identity>> {
        let tables = self.tables();
        let Some(user) = tables.user(user_id).cloned() else {
            return Ok(None);
        };
        let Some(clinic) = tables.clinics.iter().find(|c| c.id == user.clinic_id).cloned() else {
            return Ok(None);
        };
        let marker = |markers: &[Marker]| markers.iter().find(|m| m.1 == user_id).map(|m| m.0);

        Ok(Some(Identity {
            health_worker_id: marker(&tables.health_workers),
            clinic_admin_id: marker(&tables.clinic_admins),
            user,
            clinic,
        }))
    }

    async fn find_duplicate_user(
        &self,
        clinic_id: Uuid,
        fields: &UniqueUserFields,
        exclude_user: Option<Uuid>,
    ) -> RepoResult<Option<&'static str>> {
        Ok(self
            .tables()
            .users
            .iter()
            .map(|s| &s.user)
            .filter(|u| u.clinic_id == clinic_id && Some(u.id) != exclude_user)
            .find_map(|u| first_collision(fields, &u.email, &u.ci, u.phone.as_deref())))
    }

    async fn list_health_workers(
        &self,
        clinic_id: Uuid,
        search: Option<&str>,
    ) -> RepoResult<Vec<HealthWorker>> {
        let tables = self.tables();
        let mut workers: Vec<HealthWorker> = tables
            .health_workers
            .iter()
            .filter_map(|m| tables.health_worker(m))
            .filter(|w| w.user.clinic_id == clinic_id)
            .filter(|w| search.is_none_or(|needle| user_matches(&w.user, needle)))
            .collect();
        workers.sort_by(|a, b| {
            (&a.user.last_name, &a.user.first_name).cmp(&(&b.user.last_name, &b.user.first_name))
        });
        Ok(workers)
    }

    async fn get_health_worker(&self, id: Uuid) -> RepoResult<Option<HealthWorker>> {
        let tables = self.tables();
        Ok(tables
            .health_workers
            .iter()
            .find(|m| m.0 == id)
            .and_then(|m| tables.health_worker(m)))
    }

    async fn find_health_worker_by_ci(
        &self,
        clinic_id: Uuid,
        ci: &str,
    ) -> RepoResult<Option<HealthWorker>> {
        let tables = self.tables();
        Ok(tables
            .health_workers
            .iter()
            .filter_map(|m| tables.health_worker(m))
            .find(|w| w.user.clinic_id == clinic_id && w.user.ci == ci))
    }

    async fn create_health_worker(&self, user: NewUser) -> RepoResult<HealthWorker> {
        let mut tables = self.tables();
        let user_id = tables.insert_user(user)?;
        let marker = (Uuid::new_v4(), user_id);
        tables.health_workers.push(marker);
        tables
            .health_worker(&marker)
            .ok_or_else(|| RepositoryError::Database(sqlx::Error::RowNotFound))
    }

    async fn update_user(&self, user_id: Uuid, changes: &UserChanges) -> RepoResult<Option<User>> {
        let mut tables = self.tables();
        let Some(clinic_id) = tables.user(user_id).map(|u| u.clinic_id) else {
            return Ok(None);
        };
        let fields = UniqueUserFields {
            email: changes.email.clone(),
            ci: changes.ci.clone(),
            phone: changes.phone.clone(),
        };
        tables.check_unique(clinic_id, &fields, Some(user_id))?;

        Ok(tables
            .users
            .iter_mut()
            .find(|s| s.user.id == user_id)
            .map(|stored| {
                changes.apply_to(&mut stored.user);
                stored.user.clone()
            }))
    }

    async fn delete_user(&self, user_id: Uuid) -> RepoResult<bool> {
        let mut tables = self.tables();
        let before = tables.users.len();
        tables.users.retain(|s| s.user.id != user_id);
        if tables.users.len() == before {
            return Ok(false);
        }

        let workers: Vec<Uuid> = tables
            .health_workers
            .iter()
            .filter(|m| m.1 == user_id)
            .map(|m| m.0)
            .collect();
        for worker in workers {
            tables.remove_health_worker_rows(worker);
        }
        tables.health_workers.retain(|m| m.1 != user_id);
        tables.clinic_admins.retain(|m| m.1 != user_id);
        Ok(true)
    }

    async fn list_clinic_admins(
        &self,
        clinic_id: Uuid,
        search: Option<&str>,
    ) -> RepoResult<Vec<ClinicAdmin>> {
        let tables = self.tables();
        let mut admins: Vec<ClinicAdmin> = tables
            .clinic_admins
            .iter()
            .filter_map(|m| tables.clinic_admin(m))
            .filter(|a| a.user.clinic_id == clinic_id)
            .filter(|a| search.is_none_or(|needle| user_matches(&a.user, needle)))
            .collect();
        admins.sort_by(|a, b| {
            (&a.user.last_name, &a.user.first_name).cmp(&(&b.user.last_name, &b.user.first_name))
        });
        Ok(admins)
    }

    async fn get_clinic_admin(&self, id: Uuid) -> RepoResult<Option<ClinicAdmin>> {
        let tables = self.tables();
        Ok(tables
            .clinic_admins
            .iter()
            .find(|m| m.0 == id)
            .and_then(|m| tables.clinic_admin(m)))
    }

    async fn create_clinic_admin(&self, user: NewUser) -> RepoResult<ClinicAdmin> {
        let mut tables = self.tables();
        let user_id = tables.insert_user(user)?;
        let marker = (Uuid::new_v4(), user_id);
        tables.clinic_admins.push(marker);
        tables
            .clinic_admin(&marker)
            .ok_or_else(|| RepositoryError::Database(sqlx::Error::RowNotFound))
    }

    async fn get_configuration(&self, clinic_id: Uuid) -> RepoResult<Option<Configuration>> {
        Ok(self
            .tables()
            .configurations
            .iter()
            .find(|c| c.clinic_id == clinic_id)
            .cloned())
    }

    async fn update_configuration(
        &self,
        clinic_id: Uuid,
        changes: &ConfigurationChanges,
    ) -> RepoResult<Option<Configuration>> {
        Ok(self
            .tables()
            .configurations
            .iter_mut()
            .find(|c| c.clinic_id == clinic_id)
            .map(|configuration| {
                configuration.apply(changes);
                configuration.clone()
            }))
    }

    async fn create_document(&self, document: NewClinicalDocument) -> RepoResult<ClinicalDocument> {
        let now = Utc::now();
        let created = ClinicalDocument {
            id: Uuid::new_v4(),
            clinic_id: document.clinic_id,
            health_worker_id: document.health_worker_id,
            health_user_ci: document.health_user_ci,
            title: document.title,
            description: document.description,
            document_type: document.document_type,
            content: document.content,
            s3_key: document.s3_key,
            content_type: document.content_type,
            file_size: document.file_size,
            created_at: now,
            updated_at: now,
        };
        self.tables().documents.push(created.clone());
        Ok(created)
    }

    async fn list_documents(
        &self,
        clinic_id: Uuid,
        filter: &DocumentFilter,
    ) -> RepoResult<Vec<ClinicalDocument>> {
        Ok(self
            .tables()
            .documents
            .iter()
            .rev()
            .filter(|d| d.clinic_id == clinic_id)
            .filter(|d| {
                filter
                    .health_user_ci
                    .as_ref()
                    .is_none_or(|ci| &d.health_user_ci == ci)
            })
            .filter(|d| {
                filter
                    .document_type
                    .as_ref()
                    .is_none_or(|t| &d.document_type == t)
            })
            .cloned()
            .collect())
    }

    async fn get_document(&self, id: Uuid) -> RepoResult<Option<ClinicalDocument>> {
        Ok(self.tables().documents.iter().find(|d| d.id == id).cloned())
    }

    async fn update_document(
        &self,
        id: Uuid,
        changes: &DocumentChanges,
    ) -> RepoResult<Option<ClinicalDocument>> {
        Ok(self
            .tables()
            .documents
            .iter_mut()
            .find(|d| d.id == id)
            .map(|document| {
                if let Some(title) = &changes.title {
                    document.title = title.clone();
                }
                if let Some(description) = &changes.description {
                    document.description = description.clone();
                }
                if let Some(document_type) = &changes.document_type {
                    document.document_type = document_type.clone();
                }
                if let Some(content) = &changes.content {
                    document.content = Some(content.clone());
                }
                document.updated_at = Utc::now();
                document.clone()
            }))
    }

    async fn delete_document(&self, id: Uuid) -> RepoResult<bool> {
        let mut tables = self.tables();
        let before = tables.documents.len();
        tables.documents.retain(|d| d.id != id);
        Ok(tables.documents.len() < before)
    }

    async fn find_conversation(&self, id: Uuid) -> RepoResult<Option<Conversation>> {
        Ok(self
            .tables()
            .conversations
            .iter()
            .find(|c| c.id == id)
            .cloned())
    }

    async fn find_latest_conversation(
        &self,
        health_worker_id: Uuid,
        health_user_ci: &str,
    ) -> RepoResult<Option<Conversation>> {
        Ok(self
            .tables()
            .conversations
            .iter()
            .filter(|c| c.health_worker_id == health_worker_id && c.health_user_ci == health_user_ci)
            .max_by_key(|c| c.updated_at)
            .cloned())
    }

    async fn create_conversation(
        &self,
        health_worker_id: Uuid,
        health_user_ci: &str,
    ) -> RepoResult<Conversation> {
        let now = Utc::now();
        let conversation = Conversation {
            id: Uuid::new_v4(),
            health_worker_id,
            health_user_ci: health_user_ci.to_string(),
            created_at: now,
            updated_at: now,
        };
        self.tables().conversations.push(conversation.clone());
        Ok(conversation)
    }

    async fn list_messages(&self, conversation_id: Uuid) -> RepoResult<Vec<Message>> {
        Ok(self
            .tables()
            .messages
            .iter()
            .filter(|m| m.conversation_id == conversation_id)
            .cloned()
            .collect())
    }

    async fn add_message(
        &self,
        conversation_id: Uuid,
        role: MessageRole,
        content: &str,
    ) -> RepoResult<Message> {
        let mut tables = self.tables();
        let now = Utc::now();
        let Some(conversation) = tables
            .conversations
            .iter_mut()
            .find(|c| c.id == conversation_id)
        else {
            return Err(RepositoryError::Database(sqlx::Error::RowNotFound));
        };
        conversation.updated_at = now;

        let message = Message {
            id: Uuid::new_v4(),
            conversation_id,
            role,
            content: content.to_string(),
            created_at: now,
        };
        tables.messages.push(message.clone());
        Ok(message)
    }

    async fn list_conversations(
        &self,
        health_worker_id: Uuid,
        health_user_ci: Option<&str>,
    ) -> RepoResult<Vec<ConversationSummary>> {
        let tables = self.tables();
        let mut conversations: Vec<&Conversation> = tables
            .conversations
            .iter()
            .filter(|c| c.health_worker_id == health_worker_id)
            .filter(|c| health_user_ci.is_none_or(|ci| c.health_user_ci == ci))
            .collect();
        // Stable sort: among equal timestamps the later insertion wins.
        conversations.reverse();
        conversations.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));

        Ok(conversations
            .into_iter()
            .map(|conversation| {
                let messages: Vec<&Message> = tables
                    .messages
                    .iter()
                    .filter(|m| m.conversation_id == conversation.id)
                    .collect();
                ConversationSummary {
                    conversation: conversation.clone(),
                    last_message: messages.last().map(|m| (*m).clone()),
                    message_count: messages.len() as i64,
                }
            })
            .collect())
    }

    async fn delete_conversation(&self, id: Uuid) -> RepoResult<bool> {
        let mut tables = self.tables();
        let before = tables.conversations.len();
        tables.conversations.retain(|c| c.id != id);
        tables.messages.retain(|m| m.conversation_id != id);
        Ok(tables.conversations.len() < before)
    }
}

fn user_matches(user: &User, needle: &str) -> bool {
    matches_search(
        &[
            Some(user.first_name.as_str()),
            Some(user.last_name.as_str()),
            Some(user.email.as_str()),
            Some(user.ci.as_str()),
            user.phone.as_deref(),
        ],
        needle,
    )
}

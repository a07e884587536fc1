use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, DatabaseConnection, EntityTrait,
    IntoActiveModel, PaginatorTrait, QueryFilter, QueryOrder, Set, TransactionTrait,
};
use uuid::Uuid;

use crate::errors::ApiError;
use crate::services::crypto;
use crate::types::db::{doctor, patient, user};
use crate::types::internal::scope::{Role, UserStatus};

#[derive(Debug, Clone)]
pub struct CreateUserInput {
    pub email: String,
    pub username: Option<String>,
    pub password: String,
    pub name: String,
    pub role: Role,
    pub phone: Option<String>,

    // Doctor profile, used to provision a Doctor row on approval/login
    pub specialty: Option<String>,
    pub license_number: Option<String>,

    // Patient profile, used to create the linked Patient row
    pub national_id: Option<String>,
    pub birth_date: Option<String>,
    pub gender: Option<String>,
    pub address: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct UpdateUserInput {
    pub email: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub name: Option<String>,
    pub phone: Option<String>,
    pub specialty: Option<String>,
    pub license_number: Option<String>,
}

/// Repository for user accounts.
///
/// Owns the account lifecycle (pending/active/rejected/inactive), the
/// exactly-one-active-admin floor, and both auto-linking flows: the Patient
/// row created together with a patient-role user, and the Doctor row
/// provisioned for doctor-role users on approval or first login.
pub struct UserStore {
    db: DatabaseConnection,
}

impl UserStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    #[cfg(test)]
    pub(crate) fn db_for_tests(&self) -> &DatabaseConnection {
        &self.db
    }

    pub async fn find_by_id(&self, id: &str) -> Result<Option<user::Model>, ApiError> {
        user::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(|e| ApiError::from_db("find_user", e))
    }

    pub async fn get(&self, id: &str) -> Result<user::Model, ApiError> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| ApiError::not_found("User not found"))
    }

    /// Look up by username or email
    pub async fn find_by_identifier(
        &self,
        identifier: &str,
    ) -> Result<Option<user::Model>, ApiError> {
        user::Entity::find()
            .filter(
                Condition::any()
                    .add(user::Column::Email.eq(identifier))
                    .add(user::Column::Username.eq(identifier)),
            )
            .one(&self.db)
            .await
            .map_err(|e| ApiError::from_db("find_user_by_identifier", e))
    }

    pub async fn list(&self) -> Result<Vec<user::Model>, ApiError> {
        user::Entity::find()
            .order_by_asc(user::Column::Name)
            .all(&self.db)
            .await
            .map_err(|e| ApiError::from_db("list_users", e))
    }

    pub async fn count_active_admins(&self) -> Result<u64, ApiError> {
        user::Entity::find()
            .filter(user::Column::Role.eq(Role::Admin.as_str()))
            .filter(user::Column::Status.eq(UserStatus::Active.as_str()))
            .count(&self.db)
            .await
            .map_err(|e| ApiError::from_db("count_active_admins", e))
    }

    fn validate_new_account(input: &CreateUserInput) -> Result<(), ApiError> {
        let mut issues = Vec::new();
        if input.name.trim().is_empty() {
            issues.push("name is required".to_string());
        }
        if !input.email.contains('@') {
            issues.push("email is invalid".to_string());
        }
        if input.password.len() < 6 {
            issues.push("password must be at least 6 characters".to_string());
        }
        if input.role == Role::Patient
            && input
                .national_id
                .as_deref()
                .is_none_or(|v| v.trim().is_empty())
        {
            issues.push("national_id is required for patient accounts".to_string());
        }
        if issues.is_empty() {
            Ok(())
        } else {
            Err(ApiError::validation_fields("Validation failed", issues))
        }
    }

    async fn check_unique_identity(
        &self,
        email: &str,
        username: Option<&str>,
        exclude_id: Option<&str>,
    ) -> Result<(), ApiError> {
        let mut query = user::Entity::find().filter(user::Column::Email.eq(email));
        if let Some(id) = exclude_id {
            query = query.filter(user::Column::Id.ne(id));
        }
        if query
            .one(&self.db)
            .await
            .map_err(|e| ApiError::from_db("check_user_email", e))?
            .is_some()
        {
            return Err(ApiError::conflict("Email already registered"));
        }

        if let Some(username) = username {
            let mut query = user::Entity::find().filter(user::Column::Username.eq(username));
            if let Some(id) = exclude_id {
                query = query.filter(user::Column::Id.ne(id));
            }
            if query
                .one(&self.db)
                .await
                .map_err(|e| ApiError::from_db("check_user_username", e))?
                .is_some()
            {
                return Err(ApiError::conflict("Username already taken"));
            }
        }
        Ok(())
    }

    /// Create an account in the given status.
    ///
    /// Patient-role accounts create their linked Patient row inside the same
    /// transaction: both rows land or neither does.
    pub async fn create(
        &self,
        input: CreateUserInput,
        status: UserStatus,
    ) -> Result<user::Model, ApiError> {
        Self::validate_new_account(&input)?;
        self.check_unique_identity(&input.email, input.username.as_deref(), None)
            .await?;

        let password_hash = crypto::hash_password(&input.password)?;
        let user_id = Uuid::new_v4().to_string();
        let now = Utc::now().timestamp();

        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| ApiError::from_db("begin_create_user", e))?;

        let patient_id = if input.role == Role::Patient {
            let national_id = input.national_id.clone().unwrap_or_default();
            let duplicate = patient::Entity::find()
                .filter(patient::Column::NationalId.eq(&national_id))
                .one(&txn)
                .await
                .map_err(|e| ApiError::from_db("check_patient_national_id", e))?;
            if duplicate.is_some() {
                return Err(ApiError::conflict(
                    "A patient with that national id already exists",
                ));
            }

            let patient_row = patient::ActiveModel {
                id: Set(Uuid::new_v4().to_string()),
                name: Set(input.name.clone()),
                national_id: Set(national_id),
                birth_date: Set(input.birth_date.clone()),
                gender: Set(input.gender.clone()),
                phone: Set(input.phone.clone()),
                email: Set(Some(input.email.clone())),
                address: Set(input.address.clone()),
                blood_type: Set(None),
                allergies: Set(None),
                emergency_contact: Set(None),
                active: Set(true),
                created_at: Set(now),
            };
            let created = patient_row
                .insert(&txn)
                .await
                .map_err(|e| ApiError::from_db("create_linked_patient", e))?;
            Some(created.id)
        } else {
            None
        };

        let row = user::ActiveModel {
            id: Set(user_id),
            email: Set(input.email),
            username: Set(input.username),
            password_hash: Set(password_hash),
            name: Set(input.name),
            role: Set(input.role.as_str().to_string()),
            status: Set(status.as_str().to_string()),
            rejection_reason: Set(None),
            phone: Set(input.phone),
            specialty: Set(input.specialty),
            license_number: Set(input.license_number),
            doctor_id: Set(None),
            patient_id: Set(patient_id),
            reset_token_hash: Set(None),
            reset_token_expires_at: Set(None),
            last_login_at: Set(None),
            created_at: Set(now),
        };

        let created = row
            .insert(&txn)
            .await
            .map_err(|e| ApiError::from_db("create_user", e))?;

        txn.commit()
            .await
            .map_err(|e| ApiError::from_db("commit_create_user", e))?;

        Ok(created)
    }

    /// Public self-registration: staff accounts only, landing in pending
    /// until an administrator approves them. Patients are onboarded by staff
    /// and never self-register.
    pub async fn register(&self, input: CreateUserInput) -> Result<user::Model, ApiError> {
        match input.role {
            Role::Doctor | Role::Receptionist => self.create(input, UserStatus::Pending).await,
            Role::Patient => Err(ApiError::forbidden(
                "Patients are onboarded by clinic staff and cannot self-register",
            )),
            Role::Admin => Err(ApiError::forbidden(
                "Administrator accounts cannot be self-registered",
            )),
        }
    }

    fn status_gate(user: &user::Model) -> Result<(), ApiError> {
        let role = Role::parse(&user.role);
        match UserStatus::parse(&user.status) {
            Some(UserStatus::Active) => Ok(()),
            Some(UserStatus::Pending) => Err(ApiError::forbidden(match role {
                Some(Role::Doctor) => "Your doctor account is awaiting administrator approval",
                Some(Role::Receptionist) => {
                    "Your receptionist account is awaiting administrator approval"
                }
                _ => "Your account is awaiting administrator approval",
            })),
            Some(UserStatus::Rejected) => {
                let mut message = String::from("Your registration was rejected");
                if let Some(reason) = &user.rejection_reason {
                    message.push_str(": ");
                    message.push_str(reason);
                }
                Err(ApiError::forbidden(message))
            }
            Some(UserStatus::Inactive) => Err(ApiError::forbidden(
                "Your account has been deactivated. Contact the clinic administrator",
            )),
            None => {
                tracing::error!(user_id = %user.id, status = %user.status, "unknown user status");
                Err(ApiError::internal("Internal server error"))
            }
        }
    }

    /// Verify credentials and apply the account-status gates.
    ///
    /// On success, missing doctor links are provisioned and the last-login
    /// timestamp is updated; the refreshed row is returned.
    pub async fn authenticate(
        &self,
        identifier: &str,
        password: &str,
    ) -> Result<user::Model, ApiError> {
        let user = self
            .find_by_identifier(identifier)
            .await?
            .ok_or_else(ApiError::invalid_credentials)?;

        if !crypto::verify_password(password, &user.password_hash) {
            return Err(ApiError::invalid_credentials());
        }

        Self::status_gate(&user)?;

        let user = self.ensure_doctor_link(user).await?;

        let mut row = user.into_active_model();
        row.last_login_at = Set(Some(Utc::now().timestamp()));
        row.update(&self.db)
            .await
            .map_err(|e| ApiError::from_db("update_last_login", e))
    }

    /// Provision and link a Doctor row for a doctor-role user that has none.
    ///
    /// An existing doctor with the user's license number is reused; otherwise
    /// one is created from the user's profile fields. The write-back happens
    /// in the same transaction as the doctor insert.
    pub async fn ensure_doctor_link(&self, user: user::Model) -> Result<user::Model, ApiError> {
        if Role::parse(&user.role) != Some(Role::Doctor) || user.doctor_id.is_some() {
            return Ok(user);
        }

        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| ApiError::from_db("begin_doctor_link", e))?;

        let doctor_id = Self::provision_doctor(&txn, &user).await?;

        let mut row = user.into_active_model();
        row.doctor_id = Set(Some(doctor_id));
        let updated = row
            .update(&txn)
            .await
            .map_err(|e| ApiError::from_db("link_doctor", e))?;

        txn.commit()
            .await
            .map_err(|e| ApiError::from_db("commit_doctor_link", e))?;

        Ok(updated)
    }

    async fn provision_doctor<C: ConnectionTrait>(
        conn: &C,
        user: &user::Model,
    ) -> Result<String, ApiError> {
        let license = user
            .license_number
            .clone()
            .unwrap_or_else(|| format!("LIC-{}", &user.id[..8]));

        let existing = doctor::Entity::find()
            .filter(doctor::Column::LicenseNumber.eq(&license))
            .one(conn)
            .await
            .map_err(|e| ApiError::from_db("find_doctor_by_license", e))?;
        if let Some(doctor) = existing {
            return Ok(doctor.id);
        }

        let row = doctor::ActiveModel {
            id: Set(Uuid::new_v4().to_string()),
            name: Set(user.name.clone()),
            specialty: Set(user.specialty.clone().unwrap_or_else(|| "General".to_string())),
            license_number: Set(license),
            phone: Set(user.phone.clone()),
            email: Set(Some(user.email.clone())),
            active: Set(true),
            created_at: Set(Utc::now().timestamp()),
        };
        let created = row
            .insert(conn)
            .await
            .map_err(|e| ApiError::from_db("provision_doctor", e))?;
        Ok(created.id)
    }

    /// Approve a pending account: pending -> active, provisioning the Doctor
    /// link for doctor-role users in the same transaction.
    pub async fn approve(&self, id: &str) -> Result<user::Model, ApiError> {
        let user = self.get(id).await?;
        if UserStatus::parse(&user.status) != Some(UserStatus::Pending) {
            return Err(ApiError::validation("Only pending accounts can be approved"));
        }

        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| ApiError::from_db("begin_approve_user", e))?;

        let doctor_id = if Role::parse(&user.role) == Some(Role::Doctor) && user.doctor_id.is_none()
        {
            Some(Self::provision_doctor(&txn, &user).await?)
        } else {
            user.doctor_id.clone()
        };

        let mut row = user.into_active_model();
        row.status = Set(UserStatus::Active.as_str().to_string());
        row.rejection_reason = Set(None);
        row.doctor_id = Set(doctor_id);
        let updated = row
            .update(&txn)
            .await
            .map_err(|e| ApiError::from_db("approve_user", e))?;

        txn.commit()
            .await
            .map_err(|e| ApiError::from_db("commit_approve_user", e))?;

        Ok(updated)
    }

    /// Reject a pending account with a reason: pending -> rejected
    pub async fn reject(&self, id: &str, reason: &str) -> Result<user::Model, ApiError> {
        let user = self.get(id).await?;
        if UserStatus::parse(&user.status) != Some(UserStatus::Pending) {
            return Err(ApiError::validation("Only pending accounts can be rejected"));
        }

        let mut row = user.into_active_model();
        row.status = Set(UserStatus::Rejected.as_str().to_string());
        row.rejection_reason = Set(Some(reason.to_string()));
        row.update(&self.db)
            .await
            .map_err(|e| ApiError::from_db("reject_user", e))
    }

    /// Activate or deactivate an account.
    ///
    /// Deactivating the last active administrator is rejected.
    pub async fn set_status(&self, id: &str, status: UserStatus) -> Result<user::Model, ApiError> {
        if !matches!(status, UserStatus::Active | UserStatus::Inactive) {
            return Err(ApiError::validation(
                "Status can only be set to active or inactive",
            ));
        }

        let user = self.get(id).await?;
        if status == UserStatus::Inactive
            && Role::parse(&user.role) == Some(Role::Admin)
            && UserStatus::parse(&user.status) == Some(UserStatus::Active)
            && self.count_active_admins().await? <= 1
        {
            return Err(ApiError::conflict(
                "At least one active administrator must remain",
            ));
        }

        let mut row = user.into_active_model();
        row.status = Set(status.as_str().to_string());
        row.update(&self.db)
            .await
            .map_err(|e| ApiError::from_db("set_user_status", e))
    }

    /// Partial profile update; the password is rehashed only when a new one
    /// is supplied.
    pub async fn update(&self, id: &str, input: UpdateUserInput) -> Result<user::Model, ApiError> {
        let existing = self.get(id).await?;

        let email = input.email.clone().unwrap_or_else(|| existing.email.clone());
        if !email.contains('@') {
            return Err(ApiError::validation_fields(
                "Validation failed",
                vec!["email is invalid".to_string()],
            ));
        }
        let username = input
            .username
            .clone()
            .or_else(|| existing.username.clone());
        self.check_unique_identity(&email, username.as_deref(), Some(id))
            .await?;

        let mut row = existing.into_active_model();
        if let Some(email) = input.email {
            row.email = Set(email);
        }
        if let Some(username) = input.username {
            row.username = Set(Some(username));
        }
        if let Some(password) = input.password {
            if password.len() < 6 {
                return Err(ApiError::validation_fields(
                    "Validation failed",
                    vec!["password must be at least 6 characters".to_string()],
                ));
            }
            row.password_hash = Set(crypto::hash_password(&password)?);
        }
        if let Some(name) = input.name {
            row.name = Set(name);
        }
        if let Some(phone) = input.phone {
            row.phone = Set(Some(phone));
        }
        if let Some(specialty) = input.specialty {
            row.specialty = Set(Some(specialty));
        }
        if let Some(license_number) = input.license_number {
            row.license_number = Set(Some(license_number));
        }

        row.update(&self.db)
            .await
            .map_err(|e| ApiError::from_db("update_user", e))
    }

    /// Delete an account; removing the last active administrator is rejected.
    pub async fn delete(&self, id: &str) -> Result<(), ApiError> {
        let user = self.get(id).await?;

        if Role::parse(&user.role) == Some(Role::Admin)
            && UserStatus::parse(&user.status) == Some(UserStatus::Active)
            && self.count_active_admins().await? <= 1
        {
            return Err(ApiError::conflict(
                "At least one active administrator must remain",
            ));
        }

        user::Entity::delete_by_id(id)
            .exec(&self.db)
            .await
            .map_err(|e| ApiError::from_db("delete_user", e))?;
        Ok(())
    }

    /// Store a password-reset token hash for the account with this email.
    ///
    /// Returns `None` (without error) when no such account exists, so the
    /// caller can answer generically and not leak which emails are known.
    pub async fn set_reset_token(
        &self,
        email: &str,
        token_hash: &str,
        expires_at: i64,
    ) -> Result<Option<user::Model>, ApiError> {
        let Some(user) = user::Entity::find()
            .filter(user::Column::Email.eq(email))
            .one(&self.db)
            .await
            .map_err(|e| ApiError::from_db("find_user_by_email", e))?
        else {
            return Ok(None);
        };

        let mut row = user.into_active_model();
        row.reset_token_hash = Set(Some(token_hash.to_string()));
        row.reset_token_expires_at = Set(Some(expires_at));
        let updated = row
            .update(&self.db)
            .await
            .map_err(|e| ApiError::from_db("set_reset_token", e))?;
        Ok(Some(updated))
    }

    /// Roll back an issued reset token (mail delivery failed)
    pub async fn clear_reset_token(&self, user_id: &str) -> Result<(), ApiError> {
        let user = self.get(user_id).await?;
        let mut row = user.into_active_model();
        row.reset_token_hash = Set(None);
        row.reset_token_expires_at = Set(None);
        row.update(&self.db)
            .await
            .map_err(|e| ApiError::from_db("clear_reset_token", e))?;
        Ok(())
    }

    /// Consume a reset token: rehash the password and clear the token so it
    /// cannot be used twice.
    pub async fn reset_password(
        &self,
        token_hash: &str,
        new_password: &str,
    ) -> Result<user::Model, ApiError> {
        if new_password.len() < 6 {
            return Err(ApiError::validation_fields(
                "Validation failed",
                vec!["password must be at least 6 characters".to_string()],
            ));
        }

        let user = user::Entity::find()
            .filter(user::Column::ResetTokenHash.eq(token_hash))
            .one(&self.db)
            .await
            .map_err(|e| ApiError::from_db("find_user_by_reset_token", e))?
            .ok_or_else(|| ApiError::validation("Invalid or expired reset token"))?;

        let now = Utc::now().timestamp();
        if user.reset_token_expires_at.is_none_or(|exp| exp < now) {
            return Err(ApiError::validation("Invalid or expired reset token"));
        }

        let mut row = user.into_active_model();
        row.password_hash = Set(crypto::hash_password(new_password)?);
        row.reset_token_hash = Set(None);
        row.reset_token_expires_at = Set(None);
        row.update(&self.db)
            .await
            .map_err(|e| ApiError::from_db("reset_password", e))
    }

    /// Seed an active administrator account when none exists, so the
    /// one-active-admin invariant holds from the first request.
    pub async fn seed_default_admin(
        &self,
        email: &str,
        password: &str,
        name: &str,
    ) -> Result<Option<user::Model>, ApiError> {
        if self.count_active_admins().await? > 0 {
            return Ok(None);
        }

        let created = self
            .create(
                CreateUserInput {
                    email: email.to_string(),
                    username: Some("admin".to_string()),
                    password: password.to_string(),
                    name: name.to_string(),
                    role: Role::Admin,
                    phone: None,
                    specialty: None,
                    license_number: None,
                    national_id: None,
                    birth_date: None,
                    gender: None,
                    address: None,
                },
                UserStatus::Active,
            )
            .await?;
        Ok(Some(created))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use migration::{Migrator, MigratorTrait};
    use sea_orm::Database;

    async fn setup_store() -> UserStore {
        let db = Database::connect("sqlite::memory:")
            .await
            .expect("Failed to create test database");
        Migrator::up(&db, None)
            .await
            .expect("Failed to run migrations");
        UserStore::new(db)
    }

    fn account(email: &str, role: Role) -> CreateUserInput {
        CreateUserInput {
            email: email.to_string(),
            username: None,
            password: "secret123".to_string(),
            name: "Test User".to_string(),
            role,
            phone: None,
            specialty: None,
            license_number: None,
            national_id: None,
            birth_date: None,
            gender: None,
            address: None,
        }
    }

    #[tokio::test]
    async fn create_patient_user_creates_linked_patient_row() {
        let store = setup_store().await;
        let mut input = account("ana@clinic.local", Role::Patient);
        input.national_id = Some("12345678".to_string());

        let user = store.create(input, UserStatus::Active).await.unwrap();
        let patient_id = user.patient_id.expect("patient link missing");

        let patient = patient::Entity::find_by_id(&patient_id)
            .one(&store.db)
            .await
            .unwrap()
            .expect("linked patient missing");
        assert_eq!(patient.national_id, "12345678");
        assert_eq!(patient.name, "Test User");
    }

    #[tokio::test]
    async fn patient_user_creation_rolls_back_on_duplicate_national_id() {
        let store = setup_store().await;
        let mut first = account("ana@clinic.local", Role::Patient);
        first.national_id = Some("12345678".to_string());
        store.create(first, UserStatus::Active).await.unwrap();

        let mut second = account("otra@clinic.local", Role::Patient);
        second.national_id = Some("12345678".to_string());
        let err = store.create(second, UserStatus::Active).await.unwrap_err();
        assert!(matches!(err, ApiError::Conflict(_)));

        // Neither the user nor a second patient row was created
        assert!(store
            .find_by_identifier("otra@clinic.local")
            .await
            .unwrap()
            .is_none());
        let patients = patient::Entity::find().all(&store.db).await.unwrap();
        assert_eq!(patients.len(), 1);
    }

    #[tokio::test]
    async fn create_rejects_duplicate_email_and_username() {
        let store = setup_store().await;
        let mut input = account("a@clinic.local", Role::Receptionist);
        input.username = Some("front".to_string());
        store.create(input, UserStatus::Active).await.unwrap();

        let err = store
            .create(account("a@clinic.local", Role::Receptionist), UserStatus::Active)
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Conflict(_)));

        let mut input = account("b@clinic.local", Role::Receptionist);
        input.username = Some("front".to_string());
        let err = store.create(input, UserStatus::Active).await.unwrap_err();
        assert!(matches!(err, ApiError::Conflict(_)));
    }

    #[tokio::test]
    async fn register_rejects_patient_and_admin_roles() {
        let store = setup_store().await;

        let mut patient = account("p@clinic.local", Role::Patient);
        patient.national_id = Some("111".to_string());
        assert!(matches!(
            store.register(patient).await.unwrap_err(),
            ApiError::Forbidden(_)
        ));

        assert!(matches!(
            store
                .register(account("root@clinic.local", Role::Admin))
                .await
                .unwrap_err(),
            ApiError::Forbidden(_)
        ));
    }

    #[tokio::test]
    async fn register_creates_pending_staff_account() {
        let store = setup_store().await;
        let created = store
            .register(account("doc@clinic.local", Role::Doctor))
            .await
            .unwrap();
        assert_eq!(created.status, "pending");
    }

    #[tokio::test]
    async fn authenticate_checks_password_and_identifier() {
        let store = setup_store().await;
        let mut input = account("doc@clinic.local", Role::Receptionist);
        input.username = Some("front".to_string());
        store.create(input, UserStatus::Active).await.unwrap();

        // By email and by username
        assert!(store
            .authenticate("doc@clinic.local", "secret123")
            .await
            .is_ok());
        let user = store.authenticate("front", "secret123").await.unwrap();
        assert!(user.last_login_at.is_some());

        assert!(matches!(
            store
                .authenticate("doc@clinic.local", "wrong")
                .await
                .unwrap_err(),
            ApiError::Unauthorized(_)
        ));
        assert!(matches!(
            store.authenticate("nobody", "secret123").await.unwrap_err(),
            ApiError::Unauthorized(_)
        ));
    }

    #[tokio::test]
    async fn authenticate_pending_account_is_forbidden_with_pending_message() {
        let store = setup_store().await;
        store
            .register(account("doc@clinic.local", Role::Doctor))
            .await
            .unwrap();

        let err = store
            .authenticate("doc@clinic.local", "secret123")
            .await
            .unwrap_err();
        match err {
            ApiError::Forbidden(body) => {
                assert!(body.0.message.contains("awaiting administrator approval"));
            }
            other => panic!("expected Forbidden, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn authenticate_rejected_account_mentions_reason() {
        let store = setup_store().await;
        let created = store
            .register(account("doc@clinic.local", Role::Doctor))
            .await
            .unwrap();
        store.reject(&created.id, "license expired").await.unwrap();

        let err = store
            .authenticate("doc@clinic.local", "secret123")
            .await
            .unwrap_err();
        match err {
            ApiError::Forbidden(body) => {
                assert!(body.0.message.contains("license expired"));
            }
            other => panic!("expected Forbidden, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn login_auto_provisions_doctor_link() {
        let store = setup_store().await;
        let mut input = account("doc@clinic.local", Role::Doctor);
        input.specialty = Some("Cardiology".to_string());
        input.license_number = Some("CMP-001".to_string());
        store.create(input, UserStatus::Active).await.unwrap();

        let user = store
            .authenticate("doc@clinic.local", "secret123")
            .await
            .unwrap();
        let doctor_id = user.doctor_id.expect("doctor link missing");

        let doctor = doctor::Entity::find_by_id(&doctor_id)
            .one(&store.db)
            .await
            .unwrap()
            .expect("provisioned doctor missing");
        assert_eq!(doctor.license_number, "CMP-001");
        assert_eq!(doctor.specialty, "Cardiology");

        // Second login keeps the same link
        let again = store
            .authenticate("doc@clinic.local", "secret123")
            .await
            .unwrap();
        assert_eq!(again.doctor_id.as_deref(), Some(doctor_id.as_str()));
    }

    #[tokio::test]
    async fn approve_activates_and_provisions_doctor() {
        let store = setup_store().await;
        let mut input = account("doc@clinic.local", Role::Doctor);
        input.license_number = Some("CMP-777".to_string());
        let created = store.register(input).await.unwrap();

        let approved = store.approve(&created.id).await.unwrap();
        assert_eq!(approved.status, "active");
        assert!(approved.doctor_id.is_some());

        // Approving twice is a validation error
        assert!(matches!(
            store.approve(&created.id).await.unwrap_err(),
            ApiError::Validation(_)
        ));
    }

    #[tokio::test]
    async fn deleting_last_active_admin_is_rejected() {
        let store = setup_store().await;
        let admin = store
            .seed_default_admin("admin@clinic.local", "admin123", "Administrator")
            .await
            .unwrap()
            .expect("admin seeded");

        let err = store.delete(&admin.id).await.unwrap_err();
        assert!(matches!(err, ApiError::Conflict(_)));

        // With a second active admin, deletion succeeds
        let second = store
            .create(account("admin2@clinic.local", Role::Admin), UserStatus::Active)
            .await
            .unwrap();
        store.delete(&admin.id).await.unwrap();
        assert!(store.get(&second.id).await.is_ok());
    }

    #[tokio::test]
    async fn deactivating_last_active_admin_is_rejected() {
        let store = setup_store().await;
        let admin = store
            .seed_default_admin("admin@clinic.local", "admin123", "Administrator")
            .await
            .unwrap()
            .unwrap();

        let err = store
            .set_status(&admin.id, UserStatus::Inactive)
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Conflict(_)));
    }

    #[tokio::test]
    async fn seed_default_admin_is_idempotent() {
        let store = setup_store().await;
        assert!(store
            .seed_default_admin("admin@clinic.local", "admin123", "Administrator")
            .await
            .unwrap()
            .is_some());
        assert!(store
            .seed_default_admin("admin@clinic.local", "admin123", "Administrator")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn reset_token_is_single_use() {
        let store = setup_store().await;
        store
            .create(account("ana@clinic.local", Role::Receptionist), UserStatus::Active)
            .await
            .unwrap();

        let expires = Utc::now().timestamp() + 3600;
        store
            .set_reset_token("ana@clinic.local", "hash-1", expires)
            .await
            .unwrap()
            .expect("user exists");

        store.reset_password("hash-1", "newsecret").await.unwrap();
        assert!(store
            .authenticate("ana@clinic.local", "newsecret")
            .await
            .is_ok());

        // Replaying the same token fails
        assert!(matches!(
            store
                .reset_password("hash-1", "another")
                .await
                .unwrap_err(),
            ApiError::Validation(_)
        ));
    }

    #[tokio::test]
    async fn expired_reset_token_is_rejected() {
        let store = setup_store().await;
        store
            .create(account("ana@clinic.local", Role::Receptionist), UserStatus::Active)
            .await
            .unwrap();

        let expired = Utc::now().timestamp() - 10;
        store
            .set_reset_token("ana@clinic.local", "hash-2", expired)
            .await
            .unwrap();

        assert!(matches!(
            store
                .reset_password("hash-2", "newsecret")
                .await
                .unwrap_err(),
            ApiError::Validation(_)
        ));
    }

    #[tokio::test]
    async fn set_reset_token_for_unknown_email_is_silent() {
        let store = setup_store().await;
        let result = store
            .set_reset_token("ghost@clinic.local", "hash", 0)
            .await
            .unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn update_rehashes_password_only_when_supplied() {
        let store = setup_store().await;
        let created = store
            .create(account("ana@clinic.local", Role::Receptionist), UserStatus::Active)
            .await
            .unwrap();
        let original_hash = created.password_hash.clone();

        let updated = store
            .update(
                &created.id,
                UpdateUserInput {
                    name: Some("Ana Torres".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.password_hash, original_hash);
        assert_eq!(updated.name, "Ana Torres");

        let updated = store
            .update(
                &created.id,
                UpdateUserInput {
                    password: Some("brand-new".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_ne!(updated.password_hash, original_hash);
        assert!(store
            .authenticate("ana@clinic.local", "brand-new")
            .await
            .is_ok());
    }
}

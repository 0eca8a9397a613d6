//! Credential service - writes, generation and permission-gated reads

use std::collections::BTreeSet;
use std::sync::Arc;

use credstore_domain::{
    codes, normalize_name, AuditOperationCode, CertificateValue, CredStoreError, CredentialName,
    CredentialSummary, CredentialType, CredentialValue, CredentialView, GenerationParameters,
    OperationSet, PermissionEntry, PermissionOperation, Result, StringGenerationParameters,
    UserValue, WriteMode,
};
use tracing::debug;
use uuid::Uuid;

use super::factory::CredentialFactory;
use super::generator::{KeyPairGenerator, PasswordGenerator};
use super::store::{directory_prefix, paths_of, CredentialStore};
use super::variant::Credential;
use crate::audit::AuditRecorder;
use crate::certificate::generator::{resolve_ca, CertificateGenerator};
use crate::certificate::params::CertificateParameters;
use crate::keys::Encryptor;
use crate::permission::PermissionService;

/// Store a caller-supplied value.
#[derive(Debug, Clone)]
pub struct SetRequest {
    pub name: String,
    pub value: CredentialValue,
    pub mode: WriteMode,
    pub additional_permissions: Vec<PermissionEntry>,
}

impl SetRequest {
    pub fn new(name: impl Into<String>, value: CredentialValue) -> Self {
        Self {
            name: name.into(),
            value,
            mode: WriteMode::default(),
            additional_permissions: Vec::new(),
        }
    }

    pub fn with_mode(mut self, mode: WriteMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_permission(mut self, entry: PermissionEntry) -> Self {
        self.additional_permissions.push(entry);
        self
    }
}

/// Generate a value server-side.
#[derive(Debug, Clone)]
pub struct GenerateRequest {
    pub name: String,
    pub parameters: GenerationParameters,
    pub mode: WriteMode,
    pub additional_permissions: Vec<PermissionEntry>,
}

impl GenerateRequest {
    pub fn new(name: impl Into<String>, parameters: GenerationParameters) -> Self {
        Self {
            name: name.into(),
            parameters,
            mode: WriteMode::default(),
            additional_permissions: Vec::new(),
        }
    }

    pub fn with_mode(mut self, mode: WriteMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_permission(mut self, entry: PermissionEntry) -> Self {
        self.additional_permissions.push(entry);
        self
    }
}

/// Credential service
pub struct CredentialService {
    store: CredentialStore,
    factory: CredentialFactory,
    permissions: Arc<PermissionService>,
    passwords: PasswordGenerator,
    key_pairs: Option<Arc<dyn KeyPairGenerator>>,
    certificates: Option<Arc<CertificateGenerator>>,
}

impl CredentialService {
    pub fn new(
        store: CredentialStore,
        factory: CredentialFactory,
        permissions: Arc<PermissionService>,
    ) -> Self {
        Self {
            store,
            factory,
            permissions,
            passwords: PasswordGenerator::new(),
            key_pairs: None,
            certificates: None,
        }
    }

    /// Enable `ssh` and `rsa` generation.
    pub fn with_key_pair_generator(mut self, generator: Arc<dyn KeyPairGenerator>) -> Self {
        self.key_pairs = Some(generator);
        self
    }

    /// Enable certificate generation and regeneration.
    pub fn with_certificate_generator(mut self, generator: Arc<CertificateGenerator>) -> Self {
        self.certificates = Some(generator);
        self
    }

    pub fn store(&self) -> &CredentialStore {
        &self.store
    }

    pub fn encryptor(&self) -> &Encryptor {
        self.factory.encryptor()
    }

    pub fn permissions(&self) -> &PermissionService {
        &self.permissions
    }

    // ========================================================================
    // Writes
    // ========================================================================

    pub async fn set(
        &self,
        actor: &str,
        request: SetRequest,
        audit: &mut AuditRecorder,
    ) -> Result<CredentialView> {
        let name = CredentialName::normalized(&request.name)?;
        let existing = self.store.most_recent(&name).await?;
        if let Err(err) = self
            .guard_existing(actor, &name, existing.as_ref(), request.value.credential_type())
            .await
        {
            audit.credential(AuditOperationCode::CredentialUpdate, &name);
            return Err(err);
        }

        let should_write = match (request.mode, &existing) {
            (_, None) | (WriteMode::Overwrite, _) => true,
            (WriteMode::NoOverwrite, Some(_)) => false,
            (WriteMode::Converge, Some(current)) => {
                let current = current.value(self.encryptor())?;
                current.without_derived() != request.value.without_derived()
            }
        };

        match existing {
            Some(current) if !should_write => keep(current, self.encryptor(), audit),
            existing => {
                audit.credential(AuditOperationCode::CredentialUpdate, &name);
                self.write_new(
                    actor,
                    &name,
                    existing,
                    &request.value,
                    None,
                    request.additional_permissions,
                    audit,
                )
                .await
            }
        }
    }

    pub async fn generate(
        &self,
        actor: &str,
        request: GenerateRequest,
        audit: &mut AuditRecorder,
    ) -> Result<CredentialView> {
        let name = CredentialName::normalized(&request.name)?;
        let existing = self.store.most_recent(&name).await?;
        if let Err(err) = self
            .guard_existing(actor, &name, existing.as_ref(), request.parameters.credential_type())
            .await
        {
            audit.credential(AuditOperationCode::CredentialUpdate, &name);
            return Err(err);
        }

        let should_write = match (request.mode, &existing) {
            (_, None) | (WriteMode::Overwrite, _) => true,
            (WriteMode::NoOverwrite, Some(_)) => false,
            (WriteMode::Converge, Some(current)) => {
                !self.same_parameters(current, &request.parameters)?
            }
        };

        match existing {
            Some(current) if !should_write => keep(current, self.encryptor(), audit),
            existing => {
                audit.credential(AuditOperationCode::CredentialUpdate, &name);
                let value = self.generate_value(actor, &request.parameters).await?;
                self.write_new(
                    actor,
                    &name,
                    existing,
                    &value,
                    Some(&request.parameters),
                    request.additional_permissions,
                    audit,
                )
                .await
            }
        }
    }

    /// New version of `name` generated from its current parameters.
    ///
    /// Password and user credentials without stored parameters have them
    /// inferred from the current password.
    pub async fn regenerate(
        &self,
        actor: &str,
        name: &str,
        audit: &mut AuditRecorder,
    ) -> Result<CredentialView> {
        let name = normalize_name(name);
        audit.credential(AuditOperationCode::CredentialUpdate, &name);

        self.permissions.ensure_readable(actor, &name).await?;
        let current = self
            .store
            .most_recent(&name)
            .await?
            .ok_or_else(|| CredStoreError::not_found(codes::CREDENTIAL_INVALID_ACCESS))?;
        self.permissions.ensure_allowed(actor, &name, PermissionOperation::Write).await?;

        let encryptor = self.encryptor();
        let (value, parameters) = match &current {
            Credential::Password(c) => {
                let params = match c.generation_parameters(encryptor)? {
                    Some(params) => params,
                    None => StringGenerationParameters::infer_from(&c.password(encryptor)?),
                };
                let parameters = GenerationParameters::Password(params);
                (self.generate_value(actor, &parameters).await?, Some(parameters))
            }
            Credential::User(c) => {
                let mut params = match c.generation_parameters(encryptor)? {
                    Some(params) => params,
                    None => StringGenerationParameters::infer_from(&c.password(encryptor)?),
                };
                params.username = c.username().map(str::to_string);
                let parameters = GenerationParameters::User(params);
                (self.generate_value(actor, &parameters).await?, Some(parameters))
            }
            Credential::Ssh(c) => {
                let stored = c.generation_parameters(encryptor)?.unwrap_or_default();
                let parameters = GenerationParameters::Ssh(stored);
                (self.generate_value(actor, &parameters).await?, Some(parameters))
            }
            Credential::Rsa(c) => {
                let stored = c.generation_parameters(encryptor)?.unwrap_or_default();
                let parameters = GenerationParameters::Rsa(stored);
                (self.generate_value(actor, &parameters).await?, Some(parameters))
            }
            Credential::Certificate(c) => {
                let generator = self.certificate_generator()?;
                let parsed = generator.codec().parse(c.certificate())?;
                let params = CertificateParameters::from_parsed(parsed, c.ca_name())?;
                let certificate = self.generate_certificate(actor, &params).await?;
                (CredentialValue::Certificate(certificate), None)
            }
            Credential::Value(_) | Credential::Json(_) => {
                return Err(CredStoreError::validation(codes::CANNOT_REGENERATE));
            }
        };

        let credential =
            self.factory.new_version(&name, &value, Some(&current), parameters.as_ref())?;
        let saved = self.store.save(credential, Vec::new()).await?;
        saved.view(encryptor)
    }

    /// Re-issue the certificate `name` under `ca_name` as a new version.
    ///
    /// Permission checks are the caller's responsibility.
    pub(crate) async fn reissue_certificate(
        &self,
        name: &str,
        ca_name: &str,
        issuer: &CertificateValue,
    ) -> Result<()> {
        let generator = self.certificate_generator()?;
        let not_found = || CredStoreError::not_found(codes::CREDENTIAL_INVALID_ACCESS);
        let current = self.store.most_recent(name).await?.ok_or_else(not_found)?;
        let Credential::Certificate(certificate) = &current else {
            return Err(not_found());
        };

        let parsed = generator.codec().parse(certificate.certificate())?;
        let params = CertificateParameters::from_parsed(parsed, Some(ca_name))?;
        let value = generator.generate(&params, Some(issuer)).await?;

        let credential = self.factory.new_version(
            name,
            &CredentialValue::Certificate(value),
            Some(&current),
            None,
        )?;
        self.store.save(credential, Vec::new()).await?;
        Ok(())
    }

    // ========================================================================
    // Reads
    // ========================================================================

    pub async fn find_most_recent(
        &self,
        actor: &str,
        name: &str,
        audit: &mut AuditRecorder,
    ) -> Result<CredentialView> {
        let name = normalize_name(name);
        audit.credential(AuditOperationCode::CredentialAccess, &name);

        self.permissions.ensure_readable(actor, &name).await?;
        let credential = self
            .store
            .most_recent(&name)
            .await?
            .ok_or_else(|| CredStoreError::not_found(codes::CREDENTIAL_INVALID_ACCESS))?;
        credential.view(self.encryptor())
    }

    /// Every version of `name`, newest first.
    pub async fn find_all_versions(
        &self,
        actor: &str,
        name: &str,
        audit: &mut AuditRecorder,
    ) -> Result<Vec<CredentialView>> {
        let name = normalize_name(name);
        audit.credential(AuditOperationCode::CredentialAccess, &name);

        self.permissions.ensure_readable(actor, &name).await?;
        let versions = self.store.all_versions(&name).await?;
        if versions.is_empty() {
            return Err(CredStoreError::not_found(codes::CREDENTIAL_INVALID_ACCESS));
        }
        versions.iter().map(|c| c.view(self.encryptor())).collect()
    }

    pub async fn find_by_uuid(
        &self,
        actor: &str,
        uuid: Uuid,
        audit: &mut AuditRecorder,
    ) -> Result<CredentialView> {
        let not_found = || CredStoreError::not_found(codes::CREDENTIAL_INVALID_ACCESS);
        let credential = self.store.find_by_uuid(uuid).await?.ok_or_else(not_found)?;
        audit.credential(AuditOperationCode::CredentialAccess, credential.name());

        self.permissions.ensure_readable(actor, credential.name()).await?;
        credential.view(self.encryptor())
    }

    pub async fn find_containing_name(
        &self,
        actor: &str,
        fragment: &str,
        audit: &mut AuditRecorder,
    ) -> Result<Vec<CredentialSummary>> {
        audit.operation(AuditOperationCode::CredentialFind);
        let found = self.store.find_containing_name(fragment).await?;
        self.readable(actor, found).await
    }

    pub async fn find_starting_with_path(
        &self,
        actor: &str,
        prefix: &str,
        audit: &mut AuditRecorder,
    ) -> Result<Vec<CredentialSummary>> {
        audit.operation(AuditOperationCode::CredentialFind);
        let found = self.store.find_starting_with_path(prefix).await?;
        self.readable(actor, found).await
    }

    /// Directory prefixes below `prefix` derived from names `actor` can read.
    pub async fn list_paths_under(
        &self,
        actor: &str,
        prefix: &str,
        audit: &mut AuditRecorder,
    ) -> Result<BTreeSet<String>> {
        audit.operation(AuditOperationCode::CredentialFind);
        let prefix = directory_prefix(prefix).to_lowercase();

        let mut names = self.store.repository().all_names().await?;
        if let Some(readable) = self.permissions.readable_names(actor).await? {
            names.retain(|name| readable.contains(&name.to_lowercase()));
        }

        let mut paths = paths_of(names.iter().map(String::as_str));
        paths.retain(|path| {
            let lowered = path.to_lowercase();
            lowered.starts_with(&prefix) && lowered != prefix
        });
        Ok(paths)
    }

    // ========================================================================
    // Delete
    // ========================================================================

    /// Remove `name` with all versions and access entries.
    ///
    /// Actors that cannot read the credential see it as missing; readers
    /// without DELETE get a permission error.
    pub async fn delete(&self, actor: &str, name: &str, audit: &mut AuditRecorder) -> Result<()> {
        let name = normalize_name(name);
        audit.credential(AuditOperationCode::CredentialDelete, &name);

        let not_found = || CredStoreError::not_found(codes::CREDENTIAL_INVALID_ACCESS);
        if self.store.find_by_name(&name).await?.is_none() {
            return Err(not_found());
        }
        let can_delete = self.permissions.check(actor, &name, PermissionOperation::Delete).await?;
        if !can_delete {
            if !self.permissions.check(actor, &name, PermissionOperation::Read).await? {
                return Err(not_found());
            }
            return Err(CredStoreError::permission_denied_on(
                codes::CREDENTIAL_INVALID_ACCESS,
                name,
            ));
        }

        if self.store.delete(&name).await? {
            debug!(credential = %name, "Deleted credential");
            Ok(())
        } else {
            Err(not_found())
        }
    }

    // ========================================================================
    // Helpers
    // ========================================================================

    /// WRITE permission and a matching type are required to touch an existing credential.
    async fn guard_existing(
        &self,
        actor: &str,
        name: &str,
        existing: Option<&Credential>,
        requested: CredentialType,
    ) -> Result<()> {
        let Some(current) = existing else { return Ok(()) };
        self.permissions.ensure_allowed(actor, name, PermissionOperation::Write).await?;
        if current.credential_type() != requested {
            return Err(CredStoreError::TypeMismatch {
                existing: current.credential_type().to_string(),
                requested: requested.to_string(),
            });
        }
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    async fn write_new(
        &self,
        actor: &str,
        name: &str,
        existing: Option<Credential>,
        value: &CredentialValue,
        parameters: Option<&GenerationParameters>,
        mut grants: Vec<PermissionEntry>,
        audit: &mut AuditRecorder,
    ) -> Result<CredentialView> {
        // A name created by someone else since `existing` was read makes the
        // store reject this save with `Conflict`.
        if existing.is_none() {
            grants.push(PermissionEntry {
                actor: actor.to_string(),
                operations: OperationSet::all(),
            });
        }

        let credential = self.factory.new_version(name, value, existing.as_ref(), parameters)?;
        let saved = self.store.save(credential, grants.clone()).await?;
        audit.permissions(AuditOperationCode::AclUpdate, saved.name(), &grants);
        saved.view(self.encryptor())
    }

    async fn generate_value(
        &self,
        actor: &str,
        parameters: &GenerationParameters,
    ) -> Result<CredentialValue> {
        match parameters {
            GenerationParameters::Password(params) => {
                Ok(CredentialValue::Password(self.passwords.generate(params)?))
            }
            GenerationParameters::User(params) => {
                let username = match &params.username {
                    Some(username) => username.clone(),
                    None => self.passwords.generate_username(),
                };
                Ok(CredentialValue::User(UserValue {
                    username: Some(username),
                    password: self.passwords.generate(params)?,
                    password_hash: None,
                }))
            }
            GenerationParameters::Ssh(params) => {
                params.validate()?;
                Ok(CredentialValue::Ssh(self.key_pair_generator()?.generate_ssh(params).await?))
            }
            GenerationParameters::Rsa(params) => {
                params.validate()?;
                Ok(CredentialValue::Rsa(self.key_pair_generator()?.generate_rsa(params).await?))
            }
            GenerationParameters::Certificate(request) => {
                let params = CertificateParameters::from_request(request.clone())?;
                Ok(CredentialValue::Certificate(self.generate_certificate(actor, &params).await?))
            }
        }
    }

    /// Signing with a named CA requires READ on that CA.
    async fn generate_certificate(
        &self,
        actor: &str,
        params: &CertificateParameters,
    ) -> Result<CertificateValue> {
        let generator = self.certificate_generator()?;
        match params.ca_name() {
            None => generator.generate(params, None).await,
            Some(ca_name) => {
                self.permissions.ensure_readable(actor, ca_name).await?;
                let issuer = resolve_ca(&self.store, self.encryptor(), ca_name).await?;
                generator.generate(params, Some(&issuer)).await
            }
        }
    }

    /// Whether `current` was produced from the requested parameters.
    fn same_parameters(
        &self,
        current: &Credential,
        requested: &GenerationParameters,
    ) -> Result<bool> {
        let encryptor = self.encryptor();
        Ok(match (current, requested) {
            (Credential::Password(c), GenerationParameters::Password(p)) => {
                c.generation_parameters(encryptor)?.as_ref() == Some(p)
            }
            (Credential::User(c), GenerationParameters::User(p)) => {
                c.generation_parameters(encryptor)?.as_ref() == Some(p)
            }
            (Credential::Ssh(c), GenerationParameters::Ssh(p)) => {
                c.generation_parameters(encryptor)?.as_ref() == Some(p)
            }
            (Credential::Rsa(c), GenerationParameters::Rsa(p)) => {
                c.generation_parameters(encryptor)?.as_ref() == Some(p)
            }
            (Credential::Certificate(c), GenerationParameters::Certificate(request)) => {
                let Some(generator) = &self.certificates else { return Ok(false) };
                let Ok(requested) = CertificateParameters::from_request(request.clone()) else {
                    return Ok(false);
                };
                generator
                    .codec()
                    .parse(c.certificate())
                    .and_then(|parsed| CertificateParameters::from_parsed(parsed, c.ca_name()))
                    .is_ok_and(|current| current == requested)
            }
            _ => false,
        })
    }

    async fn readable(
        &self,
        actor: &str,
        found: Vec<CredentialSummary>,
    ) -> Result<Vec<CredentialSummary>> {
        let Some(readable) = self.permissions.readable_names(actor).await? else {
            return Ok(found);
        };
        Ok(found.into_iter().filter(|s| readable.contains(&s.name.to_lowercase())).collect())
    }

    fn key_pair_generator(&self) -> Result<&Arc<dyn KeyPairGenerator>> {
        self.key_pairs
            .as_ref()
            .ok_or_else(|| CredStoreError::config("no key pair generator is configured"))
    }

    fn certificate_generator(&self) -> Result<&Arc<CertificateGenerator>> {
        self.certificates
            .as_ref()
            .ok_or_else(|| CredStoreError::config("no certificate generator is configured"))
    }
}

/// Return the current version untouched.
fn keep(
    current: Credential,
    encryptor: &Encryptor,
    audit: &mut AuditRecorder,
) -> Result<CredentialView> {
    audit.credential(AuditOperationCode::CredentialAccess, current.name());
    current.view(encryptor)
}

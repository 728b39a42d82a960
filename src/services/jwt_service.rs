use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use uuid::Uuid;

use crate::models::auth::{Caller, JwtClaims, UserRole};
use crate::models::user::Profile;
use crate::utils::errors::{AppError, AppResult};

/// Configuración JWT
pub struct JwtConfig {
    pub secret: String,
    pub algorithm: Algorithm,
    pub access_token_duration: Duration,
}

impl JwtConfig {
    pub fn new(secret: impl Into<String>, expiration_secs: i64) -> Self {
        Self {
            secret: secret.into(),
            algorithm: Algorithm::HS256,
            access_token_duration: Duration::seconds(expiration_secs),
        }
    }
}

/// Servicio JWT
pub struct JwtService {
    config: JwtConfig,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl JwtService {
    pub fn new(config: JwtConfig) -> Self {
        let encoding_key = EncodingKey::from_secret(config.secret.as_ref());
        let decoding_key = DecodingKey::from_secret(config.secret.as_ref());

        Self {
            config,
            encoding_key,
            decoding_key,
        }
    }

    /// Genera un token de acceso para el perfil
    pub fn generate_access_token(&self, profile: &Profile) -> AppResult<(String, DateTime<Utc>)> {
        let now = Utc::now();
        let exp = now + self.config.access_token_duration;

        let claims = JwtClaims {
            sub: profile.uid.to_string(),
            role: profile.role.as_str().to_string(),
            tenant_id: profile.tenant_id.map(|t| t.to_string()),
            exp: exp.timestamp(),
            iat: now.timestamp(),
        };

        let token = encode(&Header::new(self.config.algorithm), &claims, &self.encoding_key)
            .map_err(|e| AppError::Internal(format!("Error generating access token: {}", e)))?;
        Ok((token, exp))
    }

    /// Valida y decodifica un token
    pub fn validate_token(&self, token: &str) -> AppResult<JwtClaims> {
        let validation = Validation::new(self.config.algorithm);

        decode::<JwtClaims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|e| AppError::Unauthorized(format!("Invalid token: {}", e)))
    }

    /// Identidad del llamante a partir del token
    pub fn caller_from_token(&self, token: &str) -> AppResult<Caller> {
        let claims = self.validate_token(token)?;

        let uid = Uuid::parse_str(&claims.sub)
            .map_err(|_| AppError::Unauthorized("Invalid subject in token".to_string()))?;
        let role = UserRole::from_str(&claims.role)
            .ok_or_else(|| AppError::Unauthorized("Invalid role in token".to_string()))?;
        let tenant_id = claims
            .tenant_id
            .as_deref()
            .map(Uuid::parse_str)
            .transpose()
            .map_err(|_| AppError::Unauthorized("Invalid tenant in token".to_string()))?;

        Ok(Caller::new(uid, role, tenant_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile(role: UserRole, tenant_id: Option<Uuid>) -> Profile {
        Profile {
            uid: Uuid::new_v4(),
            email: "driver@school.test".to_string(),
            display_name: "driver".to_string(),
            role,
            tenant_id,
            must_change_password: false,
            created_by: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_generate_and_validate_token() {
        let jwt_service = JwtService::new(JwtConfig::new("test-secret", 3600));
        let tenant = Uuid::new_v4();
        let user = profile(UserRole::Driver, Some(tenant));

        let (token, expires_at) = jwt_service.generate_access_token(&user).unwrap();
        assert!(!token.is_empty());
        assert!(expires_at > Utc::now());

        let caller = jwt_service.caller_from_token(&token).unwrap();
        assert_eq!(caller, Caller::new(user.uid, UserRole::Driver, Some(tenant)));
    }

    #[test]
    fn test_token_from_other_secret_is_rejected() {
        let issuer = JwtService::new(JwtConfig::new("secret-a", 3600));
        let verifier = JwtService::new(JwtConfig::new("secret-b", 3600));
        let (token, _) = issuer
            .generate_access_token(&profile(UserRole::Admin, None))
            .unwrap();

        assert!(matches!(
            verifier.caller_from_token(&token),
            Err(AppError::Unauthorized(_))
        ));
    }

    #[test]
    fn test_expired_token_is_rejected() {
        let jwt_service = JwtService::new(JwtConfig::new("test-secret", -3600));
        let (token, _) = jwt_service
            .generate_access_token(&profile(UserRole::Parent, None))
            .unwrap();
        assert!(jwt_service.validate_token(&token).is_err());
    }
}

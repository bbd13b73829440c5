use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::error::AuthError;
use crate::config::Secret;

/// Validity of an operator's dashboard session
pub const USER_SESSION_HOURS: i64 = 6;

/// Who a credential was issued to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Principal {
    /// Operator logged into the dashboard
    User,
    /// Worker calling the job API
    App,
}

/// Validity windows an operator can pick for an app credential
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
pub enum TokenValidity {
    #[serde(rename = "day")]
    Day,
    #[serde(rename = "week")]
    Week,
    #[serde(rename = "month")]
    Month,
    #[serde(rename = "three months", alias = "three-months")]
    ThreeMonths,
    #[serde(rename = "six months", alias = "six-months")]
    SixMonths,
}

impl TokenValidity {
    /// Months count as 30 days
    pub fn duration(self) -> Duration {
        match self {
            TokenValidity::Day => Duration::days(1),
            TokenValidity::Week => Duration::days(7),
            TokenValidity::Month => Duration::days(30),
            TokenValidity::ThreeMonths => Duration::days(90),
            TokenValidity::SixMonths => Duration::days(180),
        }
    }
}

impl std::str::FromStr for TokenValidity {
    type Err = String;

    /// Accepts the dashboard form values as well as the kebab-case CLI names
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "day" => Ok(TokenValidity::Day),
            "week" => Ok(TokenValidity::Week),
            "month" => Ok(TokenValidity::Month),
            "three months" | "three-months" => Ok(TokenValidity::ThreeMonths),
            "six months" | "six-months" => Ok(TokenValidity::SixMonths),
            other => Err(format!("unknown validity '{}'", other)),
        }
    }
}

/// Claims embedded in every credential
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Username for user credentials, operator comment for app credentials
    pub sub: String,
    pub kind: Principal,
    /// Expiry as unix seconds
    pub exp: i64,
    #[serde(default)]
    pub jti: String,
}

impl Claims {
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.exp, 0)
    }
}

/// Signs and verifies HS256 credentials with the process-wide secret
pub struct TokenIssuer {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
}

impl TokenIssuer {
    pub fn new(secret: &Secret) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        // Expiry is checked against an explicit clock in `verify_at`
        validation.validate_exp = false;
        validation.required_spec_claims.clear();

        Self {
            encoding: EncodingKey::from_secret(secret.expose()),
            decoding: DecodingKey::from_secret(secret.expose()),
            validation,
        }
    }

    pub fn issue(
        &self,
        principal: Principal,
        subject: &str,
        validity: Duration,
    ) -> Result<String, AuthError> {
        self.issue_at(principal, subject, validity, Utc::now())
    }

    pub fn issue_at(
        &self,
        principal: Principal,
        subject: &str,
        validity: Duration,
        issued_at: DateTime<Utc>,
    ) -> Result<String, AuthError> {
        let claims = Claims {
            sub: subject.to_string(),
            kind: principal,
            exp: (issued_at + validity).timestamp(),
            jti: format!("{:016x}", rand::thread_rng().gen::<u64>()),
        };
        debug!("Issuing {:?} credential for '{}' until {}", principal, subject, claims.exp);

        Ok(encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)?)
    }

    /// Session credential for a dashboard login
    pub fn issue_user(&self, username: &str) -> Result<String, AuthError> {
        self.issue(Principal::User, username, Duration::hours(USER_SESSION_HOURS))
    }

    pub fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        self.verify_at(token, Utc::now())
    }

    /// Check signature, claim shape and expiry at `now`
    pub fn verify_at(&self, token: &str, now: DateTime<Utc>) -> Result<Claims, AuthError> {
        let claims = decode::<Claims>(token, &self.decoding, &self.validation)
            .map_err(|err| match err.kind() {
                ErrorKind::InvalidSignature
                | ErrorKind::InvalidAlgorithm
                | ErrorKind::InvalidAlgorithmName => AuthError::InvalidSignature,
                _ => AuthError::Malformed,
            })?
            .claims;

        if now.timestamp() >= claims.exp {
            return Err(AuthError::Expired);
        }
        Ok(claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn issuer(secret: &str) -> TokenIssuer {
        TokenIssuer::new(&Secret::new(secret))
    }

    #[test]
    fn issue_then_verify_returns_subject() {
        let issuer = issuer("secret");
        let token = issuer
            .issue(Principal::App, "nightly builder", TokenValidity::Week.duration())
            .unwrap();

        let claims = issuer.verify(&token).unwrap();
        assert_eq!(claims.sub, "nightly builder");
        assert_eq!(claims.kind, Principal::App);
    }

    #[test]
    fn app_credential_expires_after_its_window() {
        let issuer = issuer("secret");
        let issued_at = Utc::now();
        let token = issuer
            .issue_at(Principal::App, "ci", TokenValidity::Day.duration(), issued_at)
            .unwrap();

        assert!(issuer.verify_at(&token, issued_at + Duration::hours(1)).is_ok());
        assert!(matches!(
            issuer.verify_at(&token, issued_at + Duration::hours(25)),
            Err(AuthError::Expired)
        ));
    }

    #[test]
    fn expiry_instant_itself_is_expired() {
        let issuer = issuer("secret");
        let issued_at = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        let token = issuer
            .issue_at(Principal::App, "ci", Duration::seconds(60), issued_at)
            .unwrap();

        assert!(issuer.verify_at(&token, issued_at + Duration::seconds(59)).is_ok());
        assert!(matches!(
            issuer.verify_at(&token, issued_at + Duration::seconds(60)),
            Err(AuthError::Expired)
        ));
    }

    #[test]
    fn user_session_lasts_six_hours() {
        let issuer = issuer("secret");
        let token = issuer.issue_user("admin").unwrap();
        let claims = issuer.verify(&token).unwrap();

        assert_eq!(claims.kind, Principal::User);
        assert_eq!(claims.sub, "admin");
        let remaining = claims.expires_at().unwrap() - Utc::now();
        assert!(remaining > Duration::hours(5) && remaining <= Duration::hours(6));
    }

    #[test]
    fn other_secret_is_rejected() {
        let token = issuer("one")
            .issue(Principal::App, "ci", TokenValidity::Day.duration())
            .unwrap();

        assert!(matches!(
            issuer("two").verify(&token),
            Err(AuthError::InvalidSignature)
        ));
    }

    #[test]
    fn any_tampered_payload_byte_is_rejected() {
        let issuer = issuer("secret");
        let token = issuer
            .issue(Principal::App, "ci", TokenValidity::Day.duration())
            .unwrap();
        let payload_start = token.find('.').unwrap() + 1;
        let payload_end = token.rfind('.').unwrap();

        for i in payload_start..payload_end {
            let mut bytes = token.clone().into_bytes();
            bytes[i] = if bytes[i] == b'A' { b'B' } else { b'A' };
            let tampered = String::from_utf8(bytes).unwrap();

            assert!(
                issuer.verify(&tampered).is_err(),
                "tampering byte {} was accepted",
                i
            );
        }
    }

    #[test]
    fn missing_or_mistyped_claims_are_malformed() {
        let secret = Secret::new("secret");
        let issuer = TokenIssuer::new(&secret);
        let key = EncodingKey::from_secret(secret.expose());
        let exp = (Utc::now() + Duration::hours(1)).timestamp();

        let missing_kind = encode(
            &Header::default(),
            &serde_json::json!({"sub": "ci", "exp": exp}),
            &key,
        )
        .unwrap();
        assert!(matches!(issuer.verify(&missing_kind), Err(AuthError::Malformed)));

        let text_expiry = encode(
            &Header::default(),
            &serde_json::json!({"sub": "ci", "kind": "app", "exp": "tomorrow"}),
            &key,
        )
        .unwrap();
        assert!(matches!(issuer.verify(&text_expiry), Err(AuthError::Malformed)));

        assert!(matches!(issuer.verify("not-a-token"), Err(AuthError::Malformed)));
    }

    #[test]
    fn credentials_issued_together_differ() {
        let issuer = issuer("secret");
        let now = Utc::now();
        let a = issuer
            .issue_at(Principal::App, "ci", TokenValidity::Day.duration(), now)
            .unwrap();
        let b = issuer
            .issue_at(Principal::App, "ci", TokenValidity::Day.duration(), now)
            .unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn validity_accepts_form_spelling() {
        let parsed: TokenValidity = serde_json::from_str("\"three months\"").unwrap();
        assert_eq!(parsed, TokenValidity::ThreeMonths);
        assert_eq!(parsed.duration(), Duration::days(90));
        let parsed: TokenValidity = serde_json::from_str("\"six-months\"").unwrap();
        assert_eq!(parsed, TokenValidity::SixMonths);

        assert_eq!("three months".parse::<TokenValidity>(), Ok(TokenValidity::ThreeMonths));
        assert_eq!("week".parse::<TokenValidity>(), Ok(TokenValidity::Week));
        assert!("".parse::<TokenValidity>().is_err());
        assert!("forever".parse::<TokenValidity>().is_err());
    }
}

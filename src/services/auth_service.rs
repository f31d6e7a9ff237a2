//! Authentication gateway: username rules, account creation, login and
//! session-token resolution.
//!
//! Session tokens are random 64-char hex strings handed to the client as a
//! cookie. The session store only ever sees their SHA-256 digest.

use chrono::Utc;

use crate::{
    crypto::{self, PasswordError},
    error::AppError,
    models::user::{Category, JoinRequest, User},
    state::AppState,
};

pub const MIN_USERNAME_LEN: usize = 4;
pub const MAX_USERNAME_LEN: usize = 16;

const QUICK_USERNAME_LEN: usize = 10;
const QUICK_PASSWORD_LEN: usize = 16;
const QUICK_USERNAME_ATTEMPTS: usize = 5;

/// Check a username against the account naming rules.
///
/// # Rules (in order)
///
/// 1. 4 to 16 characters, otherwise `false`
/// 2. Leading or trailing whitespace raises `Format`
/// 3. Any uppercase letter raises `Format`
/// 4. Only `[a-z0-9_]`, otherwise `false`
/// 5. First character is a letter, otherwise `false`
/// 6. No run of two or more underscores, otherwise `false`
pub fn validate_username(name: &str) -> Result<bool, AppError> {
    let len = name.chars().count();
    if !(MIN_USERNAME_LEN..=MAX_USERNAME_LEN).contains(&len) {
        return Ok(false);
    }

    if name.trim() != name {
        return Err(AppError::Format(
            "Username must not start or end with whitespace".to_string(),
        ));
    }

    if name.chars().any(char::is_uppercase) {
        return Err(AppError::Format(
            "Username must be lowercase".to_string(),
        ));
    }

    if !name
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
    {
        return Ok(false);
    }

    if !name.starts_with(|c: char| c.is_ascii_lowercase()) {
        return Ok(false);
    }

    Ok(!name.contains("__"))
}

/// Validate and raise `Validation` for a rejected name.
fn require_valid_username(name: &str) -> Result<(), AppError> {
    if validate_username(name)? {
        Ok(())
    } else {
        Err(AppError::Validation(format!(
            "Username must be {MIN_USERNAME_LEN}-{MAX_USERNAME_LEN} characters of a-z, 0-9 and \
             single underscores, starting with a letter"
        )))
    }
}

/// Which kind of session a token belongs to.
///
/// User and staff sessions share the session store under disjoint keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionKind {
    User,
    Staff,
}

impl SessionKind {
    pub fn cookie_name(self) -> &'static str {
        match self {
            SessionKind::User => "token",
            SessionKind::Staff => "admin_token",
        }
    }

    /// Session store key for a token of this kind.
    pub fn key(self, token: &str) -> String {
        let digest = crypto::hash_token(token);
        match self {
            SessionKind::User => digest,
            SessionKind::Staff => format!("staff:{digest}"),
        }
    }
}

/// A freshly issued session.
#[derive(Debug, Clone)]
pub struct IssuedSession {
    pub token: String,
    pub user: User,
}

/// Hash a password off the async runtime.
pub(crate) async fn hash_password(state: &AppState, plaintext: &str) -> Result<String, AppError> {
    let hasher = state.hasher.clone();
    let plaintext = plaintext.to_string();

    tokio::task::spawn_blocking(move || hasher.hash(&plaintext))
        .await
        .map_err(|e| AppError::Internal(format!("Password hashing task failed: {e}")))?
        .map_err(|e| AppError::Internal(e.to_string()))
}

/// Verify a password off the async runtime.
///
/// A malformed stored digest is an integrity failure: logged with the
/// username and surfaced as `Integrity`, never retried.
pub(crate) async fn verify_password(
    state: &AppState,
    username: &str,
    digest: &str,
    plaintext: &str,
) -> Result<(), AppError> {
    let hasher = state.hasher.clone();
    let digest = digest.to_string();
    let plaintext = plaintext.to_string();

    let result = tokio::task::spawn_blocking(move || hasher.verify(&digest, &plaintext))
        .await
        .map_err(|e| AppError::Internal(format!("Password verification task failed: {e}")))?;

    match result {
        Ok(()) => Ok(()),
        Err(PasswordError::Mismatch) => Err(AppError::InvalidCredentials),
        Err(PasswordError::Malformed(reason)) => {
            tracing::error!(username = %username, reason = %reason, "Stored password hash is corrupt");
            Err(AppError::Integrity {
                username: username.to_string(),
            })
        }
        Err(PasswordError::Hashing(reason)) => Err(AppError::Internal(reason)),
    }
}

/// Store a new session and return its token.
pub(crate) async fn issue_session(
    state: &AppState,
    kind: SessionKind,
    username: &str,
) -> Result<String, AppError> {
    let token = crypto::generate_token();
    let expires_at = Utc::now() + state.settings.session_ttl;

    state
        .stores
        .sessions
        .set(&kind.key(&token), username, expires_at)
        .await?;

    Ok(token)
}

/// Look up the username behind a session token.
///
/// Unknown and expired tokens resolve to `None`. A live session is extended
/// to a full TTL from now, so sessions expire after a period of inactivity.
pub(crate) async fn resolve_session(
    state: &AppState,
    kind: SessionKind,
    token: &str,
) -> Result<Option<String>, AppError> {
    let key = kind.key(token);
    let Some(username) = state.stores.sessions.get(&key).await? else {
        return Ok(None);
    };

    state
        .stores
        .sessions
        .set(&key, &username, Utc::now() + state.settings.session_ttl)
        .await?;

    Ok(Some(username))
}

/// Create a permanent account (full signup).
///
/// # Errors
///
/// - `Validation`: missing fields, unknown category, password mismatch,
///   rejected or taken username
/// - `Format`: username with surrounding whitespace or uppercase letters
pub async fn register(state: &AppState, request: JoinRequest) -> Result<User, AppError> {
    let (Some(username), Some(password), Some(confirm), Some(category)) = (
        request.username,
        request.password,
        request.confirm,
        request.category,
    ) else {
        return Err(AppError::Validation(
            "username, password, confirm and category are required".to_string(),
        ));
    };

    let category: Category = category.parse()?;
    require_valid_username(&username)?;

    if password.is_empty() {
        return Err(AppError::Validation("Password must not be empty".to_string()));
    }
    if password != confirm {
        return Err(AppError::Validation("Passwords do not match".to_string()));
    }

    let user = User {
        username,
        password_hash: hash_password(state, &password).await?,
        category,
        temp: false,
        created_at: Utc::now(),
    };
    state.stores.users.insert(user.clone()).await?;

    tracing::info!(username = %user.username, category = %user.category, "Account created");

    Ok(user)
}

/// Create a temporary account with server-generated credentials and deliver
/// them to `contact` through the notifier.
pub async fn quick_register(
    state: &AppState,
    category: &str,
    contact: &str,
) -> Result<User, AppError> {
    let category: Category = category.parse()?;
    let contact = contact.trim();
    if contact.is_empty() {
        return Err(AppError::Validation("Contact is required".to_string()));
    }

    let password = crypto::generate_password(QUICK_PASSWORD_LEN);
    let password_hash = hash_password(state, &password).await?;

    for _ in 0..QUICK_USERNAME_ATTEMPTS {
        let user = User {
            username: crypto::generate_username(QUICK_USERNAME_LEN),
            password_hash: password_hash.clone(),
            category,
            temp: true,
            created_at: Utc::now(),
        };

        match state.stores.users.insert(user.clone()).await {
            Ok(()) => {
                state.notifier.send(
                    contact,
                    &format!(
                        "Your {category} account is ready. Username: {} Password: {password}",
                        user.username
                    ),
                );
                tracing::info!(username = %user.username, category = %category, "Quick-signup account created");
                return Ok(user);
            }
            // Name collision, draw again
            Err(AppError::Validation(_)) => continue,
            Err(e) => return Err(e),
        }
    }

    Err(AppError::Internal(
        "Could not allocate a unique username".to_string(),
    ))
}

/// Verify credentials and issue a session token.
///
/// # Errors
///
/// - `NotFound`: no such user
/// - `InvalidCredentials`: wrong password
/// - `Validation`: the account belongs to the other category
/// - `Integrity`: the stored hash is corrupt
pub async fn login(
    state: &AppState,
    username: &str,
    password: &str,
    category: &str,
) -> Result<IssuedSession, AppError> {
    let category: Category = category.parse()?;

    let user = state
        .stores
        .users
        .find(username)
        .await?
        .ok_or_else(|| AppError::NotFound("Unknown user".to_string()))?;

    if let Err(e) = verify_password(state, &user.username, &user.password_hash, password).await {
        if matches!(e, AppError::InvalidCredentials) {
            tracing::info!(username = %user.username, "Login rejected");
        }
        return Err(e);
    }

    if user.category != category {
        return Err(AppError::Validation(format!(
            "{} is not a {category} account",
            user.username
        )));
    }

    let token = issue_session(state, SessionKind::User, &user.username).await?;
    tracing::info!(username = %user.username, category = %user.category, "Login succeeded");

    Ok(IssuedSession { token, user })
}

/// Resolve a user session token to a username.
pub async fn resolve(state: &AppState, token: &str) -> Result<Option<String>, AppError> {
    resolve_session(state, SessionKind::User, token).await
}

/// Replace a user's password after verifying the old one.
///
/// Also clears the `temp` flag, claiming a quick-signup account.
pub async fn change_password(
    state: &AppState,
    username: &str,
    old_password: &str,
    new_password: &str,
    confirm: &str,
) -> Result<(), AppError> {
    let user = state
        .stores
        .users
        .find(username)
        .await?
        .ok_or_else(|| AppError::NotFound("Unknown user".to_string()))?;

    verify_password(state, &user.username, &user.password_hash, old_password).await?;

    if new_password.is_empty() {
        return Err(AppError::Validation("Password must not be empty".to_string()));
    }
    if new_password != confirm {
        return Err(AppError::Validation("Passwords do not match".to_string()));
    }

    let password_hash = hash_password(state, new_password).await?;
    if !state
        .stores
        .users
        .update_password(&user.username, &password_hash)
        .await?
    {
        return Err(AppError::NotFound("Unknown user".to_string()));
    }

    tracing::info!(username = %user.username, "Password changed");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::test_state;

    const LOWER: &[u8] = b"abcdefghijklmnopqrstuvwxyz";

    fn random_lowercase(len: usize) -> String {
        use rand::Rng;
        let mut rng = rand::rng();
        (0..len)
            .map(|_| char::from(LOWER[rng.random_range(0..LOWER.len())]))
            .collect()
    }

    #[test]
    fn length_bounds() {
        for len in 0..100 {
            let expected = (MIN_USERNAME_LEN..=MAX_USERNAME_LEN).contains(&len);
            assert_eq!(
                validate_username(&random_lowercase(len)).unwrap(),
                expected,
                "length {len}"
            );
        }
    }

    #[test]
    fn uppercase_raises() {
        for case in ["Apple", "APPLE", "applE"] {
            assert!(matches!(validate_username(case), Err(AppError::Format(_))));
        }
    }

    #[test]
    fn surrounding_whitespace_raises() {
        for case in [" apple", "  apple ", "apple ", "    aa", "aa    "] {
            assert!(matches!(validate_username(case), Err(AppError::Format(_))));
        }
    }

    #[test]
    fn first_character_must_be_letter() {
        for case in [
            "1apple", "2apple", "3apple", "4apple", "5apple", "6apple", "7apple", "8apple",
            "9apple", "0apple", "_apple",
        ] {
            assert!(!validate_username(case).unwrap(), "{case}");
        }
        assert!(validate_username("aapple").unwrap());
        assert!(validate_username("bapple").unwrap());
    }

    #[test]
    fn repeated_underscores_rejected() {
        let base = ["__apple", "a__pple", "ap__ple", "app__le", "appl__e", "apple__"];
        for case in base {
            assert!(!validate_username(case).unwrap(), "{case}");
            let longer = case.replace("__", "_____");
            assert!(!validate_username(&longer).unwrap(), "{longer}");
        }
        assert!(validate_username("a_pple").unwrap());
        assert!(validate_username("b_pple").unwrap());
    }

    #[test]
    fn charset_is_restricted() {
        assert!(!validate_username("ap-ple").unwrap());
        assert!(!validate_username("app le").unwrap());
        assert!(!validate_username("äpple").unwrap());
    }

    #[test]
    fn accepts_valid_names() {
        for case in ["apple", "a_ple", "a_p1e", "a_p12", "a_pl_", "a_p1_"] {
            assert!(validate_username(case).unwrap(), "{case}");
        }
    }

    fn join(username: &str, password: &str, confirm: &str, category: &str) -> JoinRequest {
        JoinRequest {
            username: Some(username.into()),
            password: Some(password.into()),
            confirm: Some(confirm.into()),
            category: Some(category.into()),
        }
    }

    #[tokio::test]
    async fn register_then_login() {
        let (state, _) = test_state();
        register(&state, join("pat_rider", "s3cret", "s3cret", "passenger"))
            .await
            .unwrap();

        let session = login(&state, "pat_rider", "s3cret", "passenger")
            .await
            .unwrap();
        assert!(session.token.len() >= 32);
        assert_eq!(
            resolve(&state, &session.token).await.unwrap().as_deref(),
            Some("pat_rider")
        );
        assert!(resolve(&state, "bogus").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn resolve_slides_session_expiry() {
        let (state, _) = test_state();
        register(&state, join("pat_rider", "pw", "pw", "passenger"))
            .await
            .unwrap();
        let session = login(&state, "pat_rider", "pw", "passenger").await.unwrap();

        // Push the session to the edge of expiry, then use it once
        let key = SessionKind::User.key(&session.token);
        state
            .stores
            .sessions
            .set(&key, "pat_rider", Utc::now() + chrono::Duration::milliseconds(500))
            .await
            .unwrap();
        assert!(resolve(&state, &session.token).await.unwrap().is_some());

        tokio::time::sleep(std::time::Duration::from_millis(800)).await;
        assert_eq!(
            resolve(&state, &session.token).await.unwrap().as_deref(),
            Some("pat_rider")
        );

        // Without the refresh the same session lapses
        state
            .stores
            .sessions
            .set(&key, "pat_rider", Utc::now() + chrono::Duration::milliseconds(200))
            .await
            .unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(400)).await;
        assert!(resolve(&state, &session.token).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn register_rejects_bad_input() {
        let (state, _) = test_state();

        let missing = JoinRequest {
            username: Some("pat_rider".into()),
            ..JoinRequest::default()
        };
        assert!(matches!(
            register(&state, missing).await,
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            register(&state, join("pat_rider", "a", "b", "passenger")).await,
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            register(&state, join("pat_rider", "a", "a", "pilot")).await,
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            register(&state, join("Pat_rider", "a", "a", "passenger")).await,
            Err(AppError::Format(_))
        ));

        register(&state, join("pat_rider", "a", "a", "passenger"))
            .await
            .unwrap();
        assert!(matches!(
            register(&state, join("pat_rider", "a", "a", "driver")).await,
            Err(AppError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn login_failures() {
        let (state, _) = test_state();
        register(&state, join("dan_driver", "pw", "pw", "driver"))
            .await
            .unwrap();

        assert!(matches!(
            login(&state, "nobody", "pw", "driver").await,
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(
            login(&state, "dan_driver", "wrong", "driver").await,
            Err(AppError::InvalidCredentials)
        ));
        assert!(matches!(
            login(&state, "dan_driver", "pw", "passenger").await,
            Err(AppError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn corrupt_hash_is_integrity_error() {
        let (state, _) = test_state();
        state
            .stores
            .users
            .insert(User {
                username: "broken".into(),
                password_hash: "$garbage".into(),
                category: Category::Driver,
                temp: false,
                created_at: Utc::now(),
            })
            .await
            .unwrap();

        assert!(matches!(
            login(&state, "broken", "pw", "driver").await,
            Err(AppError::Integrity { username }) if username == "broken"
        ));
    }

    #[tokio::test]
    async fn quick_register_delivers_credentials() {
        let (state, outbox) = test_state();
        let user = quick_register(&state, "passenger", "pat@example.com")
            .await
            .unwrap();
        assert!(user.temp);
        assert!(validate_username(&user.username).unwrap());

        let (recipient, message) = outbox.last().unwrap();
        assert_eq!(recipient, "pat@example.com");
        assert!(message.contains(&user.username));

        let password = message.rsplit(' ').next().unwrap().to_string();
        login(&state, &user.username, &password, "passenger")
            .await
            .unwrap();

        change_password(&state, &user.username, &password, "mine", "mine")
            .await
            .unwrap();
        let stored = state.stores.users.find(&user.username).await.unwrap().unwrap();
        assert!(!stored.temp);
        login(&state, &user.username, "mine", "passenger").await.unwrap();
    }

    #[tokio::test]
    async fn change_password_checks_old_and_confirm() {
        let (state, _) = test_state();
        register(&state, join("pat_rider", "old", "old", "passenger"))
            .await
            .unwrap();

        assert!(matches!(
            change_password(&state, "pat_rider", "nope", "new", "new").await,
            Err(AppError::InvalidCredentials)
        ));
        assert!(matches!(
            change_password(&state, "pat_rider", "old", "new", "other").await,
            Err(AppError::Validation(_))
        ));
        login(&state, "pat_rider", "old", "passenger").await.unwrap();
    }
}

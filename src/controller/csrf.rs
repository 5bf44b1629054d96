//! CSRF tokens kept in the session.
//!
//! Tokens live under `csrf_tokens/<form>` as a list, oldest first. At most
//! [`MAX_TOKENS_PER_FORM`] are kept per form; a token is consumed by a
//! successful check.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use rand::RngCore;

use crate::session::Session;

/// Tokens retained per form before the oldest is dropped.
pub const MAX_TOKENS_PER_FORM: usize = 10;

/// Random bytes behind each token.
pub const TOKEN_BYTES: usize = 32;

fn session_key(form_name: &str) -> String {
    format!("csrf_tokens/{form_name}")
}

/// Create a token for `form_name` and remember it in the session.
pub fn generate_token(session: &mut Session, form_name: &str) -> String {
    let key = session_key(form_name);
    let mut tokens: Vec<String> = session.get_as(&key).unwrap_or_default();
    while tokens.len() >= MAX_TOKENS_PER_FORM {
        tokens.remove(0);
    }

    let mut bytes = [0u8; TOKEN_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);
    let token: String = STANDARD
        .encode(bytes)
        .chars()
        .filter(|c| !matches!(c, '/' | '+' | '='))
        .collect();

    tokens.push(token.clone());
    session.set(key, tokens);
    token
}

/// Returns true and forgets the token if it was issued for `form_name`.
pub fn check_token(session: &mut Session, form_name: &str, token: &str) -> bool {
    let key = session_key(form_name);
    let mut tokens: Vec<String> = session.get_as(&key).unwrap_or_default();

    match tokens.iter().position(|t| t == token) {
        Some(pos) => {
            tokens.remove(pos);
            session.set(key, tokens);
            true
        }
        None => false,
    }
}

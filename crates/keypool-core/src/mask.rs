/// Mask a credential for display in admin responses
///
/// Short secrets are fully masked so their length leaks nothing.
pub fn mask_secret(secret: &str) -> String {
    if secret.is_empty() {
        return String::new();
    }
    if secret.len() <= 8 {
        return "********".to_owned();
    }
    format!("{}********{}", &secret[..3], &secret[secret.len() - 4..])
}

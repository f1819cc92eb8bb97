use crate::model::domain::model_reference::ModelReference;

/// Error fragments produced when a model download is intercepted.
const BLOCKED_DOWNLOAD_MARKERS: &[&str] = &["is not a model file", "download failed for"];

/// Advice to append to a worker error that looks like a blocked model download.
pub fn failure_hint(message: &str, model: &ModelReference) -> Option<String> {
    if model.is_local() || !BLOCKED_DOWNLOAD_MARKERS.iter().any(|m| message.contains(m)) {
        return None;
    }
    Some(format!(
        "Possible cause: a corporate proxy or firewall is blocking the model download.\n\n\
         SOLUTION:\n\
         1. Open this URL in your browser:\n{}\n\
         2. Click 'Continue' on any warning page.\n\
         3. Try again, or download the file and use a local model folder.",
        model.source()
    ))
}

/// `message` followed by its hint, when there is one.
pub fn with_hint(message: &str, model: &ModelReference) -> String {
    match failure_hint(message, model) {
        Some(hint) => format!("{message}\n\n{hint}"),
        None => message.to_string(),
    }
}

//! ---
//! lgate_section: "01-license-gate"
//! lgate_subsection: "module"
//! lgate_type: "source"
//! lgate_scope: "code"
//! lgate_description: "Wording handed to the host when a license is not valid."
//! lgate_version: "v0.0.0-prealpha"
//! lgate_owner: "tbd"
//! ---
use serde::{Deserialize, Serialize};

/// Strings the gate hands to the host's yes/no primitive.
///
/// The gate never draws UI; it only supplies these and consumes the choice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptSpec {
    /// Dialog title.
    pub title: String,
    /// Body text explaining the failure.
    pub message: String,
    /// Label of the button that opens registration.
    pub accept_label: String,
    /// Label of the button that gives up.
    pub decline_label: String,
    /// Message forwarded to the authority's activation flow.
    pub remediation_message: String,
}

impl PromptSpec {
    /// Default wording for `product`.
    #[must_use]
    pub fn for_product(product: &str) -> Self {
        Self {
            title: "License Verification Failed".to_owned(),
            message: format!(
                "The license for {product} is invalid or has expired.\n\
                 You need to activate or renew your license.\n\n\
                 Open registration dialog now?"
            ),
            accept_label: "Open Registration".to_owned(),
            decline_label: "Exit Plugin".to_owned(),
            remediation_message: format!("Please activate or renew your {product} license."),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_wording_mentions_product() {
        let prompt = PromptSpec::for_product("Android Localize Plus");
        assert!(prompt.message.starts_with("The license for Android Localize Plus"));
        assert_eq!(prompt.accept_label, "Open Registration");
        assert_eq!(prompt.decline_label, "Exit Plugin");
        assert!(prompt.remediation_message.contains("Android Localize Plus"));
    }
}

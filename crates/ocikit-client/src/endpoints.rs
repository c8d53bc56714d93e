//! Regional service endpoint construction.
//!
//! Each service publishes one base URL per region; clients are bound to one
//! of these at construction. Vault-specific KMS management and crypto
//! endpoints are not derivable from the region — they come from a vault
//! lookup against [`kms_vault`].

/// KMS vault lookup service.
pub fn kms_vault(region: &str) -> String {
    format!("https://kms.{region}.oraclecloud.com")
}

/// Secrets management ("vaults") service.
pub fn vaults(region: &str) -> String {
    format!("https://vaults.{region}.oci.oraclecloud.com")
}

/// Secret-bundle retrieval service.
pub fn secret_retrieval(region: &str) -> String {
    format!("https://secrets.vaults.{region}.oci.oraclecloud.com")
}

/// Generative-AI inference service.
pub fn genai_inference(region: &str) -> String {
    format!("https://inference.generativeai.{region}.oci.oraclecloud.com")
}

/// Agent management service.
pub fn agent(region: &str) -> String {
    format!("https://agent.generativeai.{region}.oci.oraclecloud.com")
}

/// Agent runtime service.
pub fn agent_runtime(region: &str) -> String {
    format!("https://agent-runtime.generativeai.{region}.oci.oraclecloud.com")
}

use url::Url;

use crate::error::IndexerError;

/// Indexing against a misconfigured non-localhost RPC endpoint can run up a
/// third-party provider's bill or hammer a shared node. `AutoIndexGuard`
/// refuses to start unless the endpoint resolves to loopback, or the
/// operator has explicitly opted in via `CHAINEQUITY_ALLOW_REMOTE_RPC=1`.
pub struct AutoIndexGuard;

impl AutoIndexGuard {
    pub fn check(rpc_url: &str, allow_remote: bool) -> Result<(), IndexerError> {
        if allow_remote {
            return Ok(());
        }

        if Self::is_localhost(rpc_url) {
            return Ok(());
        }

        Err(IndexerError::NonLocalhostEndpoint(rpc_url.to_string()))
    }

    fn is_localhost(rpc_url: &str) -> bool {
        let Ok(url) = Url::parse(rpc_url) else {
            return false;
        };

        matches!(url.host_str(), Some("localhost") | Some("127.0.0.1") | Some("::1"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allows_localhost_without_opt_in() {
        assert!(AutoIndexGuard::check("ws://localhost:8545", false).is_ok());
        assert!(AutoIndexGuard::check("http://127.0.0.1:8545", false).is_ok());
    }

    #[test]
    fn rejects_remote_endpoint_without_opt_in() {
        assert!(AutoIndexGuard::check("https://mainnet.infura.io/v3/key", false).is_err());
    }

    #[test]
    fn allows_remote_endpoint_with_explicit_opt_in() {
        assert!(AutoIndexGuard::check("https://mainnet.infura.io/v3/key", true).is_ok());
    }
}

use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Binance SIGNED endpoint credentials
#[derive(Clone)]
pub struct BinanceAuth {
    api_key: String,
    api_secret: String,
}

impl std::fmt::Debug for BinanceAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BinanceAuth")
            .field("api_key", &self.api_key)
            .finish_non_exhaustive()
    }
}

impl BinanceAuth {
    pub fn new(api_key: String, api_secret: String) -> Self {
        Self { api_key, api_secret }
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    /// HMAC-SHA256 of the full query string, hex encoded
    pub fn sign(&self, query: &str) -> String {
        // HMAC accepts keys of any length, so this never fails
        let mut mac = match HmacSha256::new_from_slice(self.api_secret.as_bytes()) {
            Ok(mac) => mac,
            Err(_) => return String::new(),
        };
        mac.update(query.as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }

    /// Append `recvWindow`, `timestamp` and `signature` to a query
    pub fn signed_query(&self, query: &str, recv_window_ms: u64, timestamp_ms: i64) -> String {
        let mut payload = String::from(query);
        if !payload.is_empty() {
            payload.push('&');
        }
        payload.push_str(&format!(
            "recvWindow={}&timestamp={}",
            recv_window_ms, timestamp_ms
        ));
        let signature = self.sign(&payload);
        format!("{}&signature={}", payload, signature)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOC_SECRET: &str = "NhqPtmdSJYdKjVHjA7PZj4Mge3R5YNiP1e3UZjInClVN65XAbvqqM6A7H5fATj0j";

    #[test]
    fn test_signature_matches_reference_vector() {
        let auth = BinanceAuth::new("key".to_string(), DOC_SECRET.to_string());
        let query = "symbol=LTCBTC&side=BUY&type=LIMIT&timeInForce=GTC&quantity=1&price=0.1&recvWindow=5000&timestamp=1499827319559";

        assert_eq!(
            auth.sign(query),
            "c8db56825ae71d6d79447849e617115f4a920fa2acdcab2b053c4b2838bd6b71"
        );
    }

    #[test]
    fn test_signed_query_layout() {
        let auth = BinanceAuth::new("key".to_string(), DOC_SECRET.to_string());
        let signed = auth.signed_query(
            "symbol=LTCBTC&side=BUY&type=LIMIT&timeInForce=GTC&quantity=1&price=0.1",
            5000,
            1499827319559,
        );

        assert!(signed.starts_with("symbol=LTCBTC"));
        assert!(signed.contains("&recvWindow=5000&timestamp=1499827319559&signature="));
        assert!(signed.ends_with("c8db56825ae71d6d79447849e617115f4a920fa2acdcab2b053c4b2838bd6b71"));
    }

    #[test]
    fn test_empty_query_has_no_leading_separator() {
        let auth = BinanceAuth::new("key".to_string(), "secret".to_string());
        let signed = auth.signed_query("", 5000, 1);
        assert!(signed.starts_with("recvWindow=5000&timestamp=1&signature="));
        assert_eq!(signed.rsplit('=').next().map(str::len), Some(64));
    }
}

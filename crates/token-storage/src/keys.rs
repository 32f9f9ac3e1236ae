//! Storage key constants.

/// Storage keys used by the client
pub struct StorageKeys;

impl StorageKeys {
    /// Short-lived bearer token sent with every authenticated request
    pub const ACCESS_TOKEN: &'static str = "accessToken";

    /// Long-lived token exchanged for a new access token
    pub const REFRESH_TOKEN: &'static str = "refreshToken";

    /// Both halves of the credential pair, in write order.
    pub const CREDENTIAL_PAIR: [&'static str; 2] = [Self::ACCESS_TOKEN, Self::REFRESH_TOKEN];
}

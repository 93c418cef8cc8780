/// Selection of a capture endpoint, resolved by the backend at session
/// construction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum DeviceSelector {
    /// The system default capture endpoint.
    #[default]
    Default,
    /// A specific endpoint by its opaque backend identifier.
    Id(String),
}

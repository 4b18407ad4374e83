// Panel API wire types
//
// Only the fields the adapter reads are modelled; everything else the
// service returns is ignored by serde.

use serde::{Deserialize, Serialize};

/// `POST /api/login` response body.
#[derive(Debug, Deserialize)]
pub(crate) struct LoginResponse {
    pub token: String,
    #[serde(default)]
    pub systems: Vec<String>,
}

/// Structured error body some gateways return with HTTP 200:
/// `{"error": {"code": 401, "message": "..."}}`.
#[derive(Debug, Deserialize)]
pub(crate) struct ErrorEnvelope {
    pub error: Option<ErrorBody>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ErrorBody {
    pub code: u16,
    pub message: Option<String>,
}

/// Snapshot of a security system as returned by `GET /api/systems/{id}/state`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SystemState {
    #[serde(default)]
    pub partitions: Vec<Partition>,
}

impl SystemState {
    pub fn first_partition(&self) -> Option<&Partition> {
        self.partitions.first()
    }
}

/// A subdivision of a security system with its own arm state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Partition {
    pub id: String,
    pub attributes: PartitionAttributes,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartitionAttributes {
    #[serde(default)]
    pub description: Option<String>,
    /// Raw numeric state code. Undocumented transient values (e.g. 8 while
    /// arming) show up here alongside the stable ones.
    pub state: i64,
    #[serde(default)]
    pub arm_type: Option<serde_json::Value>,
}

/// Body for arm/disarm requests.
#[derive(Debug, Serialize)]
pub(crate) struct ActionRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pin: Option<&'a str>,
}

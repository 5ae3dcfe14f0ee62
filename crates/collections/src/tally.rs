//! Message-type classification feeding plain counts into a map.

use std::collections::HashMap;
use std::fmt;

use serde_json::Value;
use strum::{Display, EnumIter};

/// Kind of message recorded for a contact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display, EnumIter)]
pub enum MessageType {
	Unknown,
	Mail,
	Push,
	#[strum(to_string = "SMS")]
	Sms,
}

impl MessageType {
	/// Maps a stored type code to a stable message type.
	pub const fn from_code(code: i64) -> Self {
		match code {
			5 => Self::Mail,
			2 => Self::Push,
			1 => Self::Sms,
			_ => Self::Unknown,
		}
	}
}

/// Counts rows per message type.
///
/// Integer rows are classified with [`MessageType::from_code`]; unknown codes
/// count as [`MessageType::Unknown`]. Rows that are not integers are skipped.
pub fn count_per_type(rows: &[Value]) -> HashMap<MessageType, i64> {
	let mut counts = HashMap::new();
	for row in rows {
		let Some(code) = row.as_i64() else {
			tracing::warn!(%row, "message type not recognized");
			continue;
		};
		*counts.entry(MessageType::from_code(code)).or_insert(0) += 1;
	}
	counts
}

/// Messages received by one contact. Displays as a one-line summary.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContactSummary {
	pub id: u64,
	pub messages: Vec<MessageType>,
}

impl fmt::Display for ContactSummary {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{} received {} messages", self.id, self.messages.len())
	}
}

//! Shared helper for the open/seal audit pattern used by every guarded
//! operation.

use orgward_core::error::OrgwardResult;
use orgward_core::repository::AuditRepository;
use tracing::error;

/// Seal `record_id` with the operation's outcome text. A failed seal
/// must not mask the operation's own error, but a successful operation
/// without a sealed record is reported as a failure.
pub(crate) async fn seal_outcome<A: AuditRepository, T>(
    audits: &A,
    record_id: i64,
    text: &str,
    meta: serde_json::Value,
    outcome: &OrgwardResult<T>,
) -> OrgwardResult<()> {
    if let Err(seal_err) = audits.seal(record_id, text, meta).await {
        error!(record_id, error = %seal_err, "Failed to seal audit record");
        if outcome.is_ok() {
            return Err(seal_err);
        }
    }
    Ok(())
}

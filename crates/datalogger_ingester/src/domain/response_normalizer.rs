use common::domain::{
    CellValue, ClientConfig, ClientRegistry, DomainError, DomainResult, FormattedBatch,
    RawResponses, Row, STATIC_COLUMNS,
};
use tracing::{debug, info, warn};

/// TOA5 payloads start with four header lines: file info, field names, units, processing
pub const TOA5_HEADER_LINES: usize = 4;

/// Header plus the trailing blank line: anything shorter is a truncated or empty answer
pub const MIN_PAYLOAD_LINES: usize = TOA5_HEADER_LINES + 1;

/// Index of the field-name line within the header
const FIELD_NAMES_LINE: usize = 1;

/// Lowercase a column name and strip everything outside `[a-z0-9_]`
pub fn sanitize_column_name(name: &str) -> String {
    name.to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_')
        .collect()
}

/// Parse one line of comma-separated, optionally quoted fields
fn parse_csv_line(line: &str) -> Result<Vec<String>, csv::Error> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(line.as_bytes());

    match reader.records().next() {
        Some(record) => Ok(record?.iter().map(str::to_string).collect()),
        None => Ok(Vec::new()),
    }
}

/// Split a payload into lines, accepting CRLF or LF endings
///
/// The final element is whatever follows the last line break, normally empty.
fn split_lines(payload: &str) -> Vec<&str> {
    payload
        .split('\n')
        .map(|line| line.strip_suffix('\r').unwrap_or(line))
        .collect()
}

/// Turn one client's TOA5 payload into a typed batch
///
/// Every row is prefixed with the client's site, address, latitude and
/// longitude. Rows whose field count does not match the header are dropped.
pub fn normalize_response(
    sequence: usize,
    address: &str,
    client: &ClientConfig,
    payload: &str,
) -> DomainResult<FormattedBatch> {
    let lines = split_lines(payload);
    if lines.len() < MIN_PAYLOAD_LINES {
        return Err(DomainError::malformed(
            address,
            format!(
                "expected at least {} lines, got {}",
                MIN_PAYLOAD_LINES,
                lines.len()
            ),
        ));
    }

    let field_names = parse_csv_line(lines[FIELD_NAMES_LINE])
        .map_err(|e| DomainError::malformed(address, format!("unreadable field names: {}", e)))?;

    let col_names: Vec<String> = STATIC_COLUMNS
        .iter()
        .copied()
        .chain(field_names.iter().map(String::as_str))
        .map(sanitize_column_name)
        .collect();

    let static_values = [
        CellValue::Text(client.site.clone()),
        CellValue::Text(address.to_string()),
        client.latitude.clone(),
        client.longitude.clone(),
    ];

    let data_lines = &lines[TOA5_HEADER_LINES..lines.len() - 1];
    let mut data: Vec<Row> = Vec::with_capacity(data_lines.len());

    for (index, line) in data_lines.iter().enumerate() {
        let fields = match parse_csv_line(line) {
            Ok(fields) => fields,
            Err(e) => {
                warn!(address, line = index + TOA5_HEADER_LINES + 1, error = %e, "dropping unreadable row");
                continue;
            }
        };

        if fields.len() != field_names.len() {
            warn!(
                address,
                line = index + TOA5_HEADER_LINES + 1,
                expected = field_names.len(),
                actual = fields.len(),
                "dropping row with unexpected field count"
            );
            continue;
        }

        let row: Row = static_values
            .iter()
            .cloned()
            .chain(fields.iter().map(|field| CellValue::coerce(field)))
            .collect();
        data.push(row);
    }

    Ok(FormattedBatch {
        sequence,
        address: address.to_string(),
        db_table: client.db_table.clone(),
        col_names,
        data,
    })
}

/// Build one batch per client that has a successful, parseable response
///
/// Clients are visited in registry order and the position is the batch
/// sequence id. Failed fetches, malformed payloads and empty windows are
/// skipped without affecting other clients.
pub fn normalize_all(responses: &RawResponses, registry: &ClientRegistry) -> Vec<FormattedBatch> {
    let mut batches = Vec::new();

    for (sequence, (address, client)) in registry.iter().enumerate() {
        let Some(response) = responses.get(address) else {
            debug!(%address, "no response for client");
            continue;
        };

        if !response.fetch_status.is_success() {
            debug!(%address, status = %response.fetch_status, "skipping failed fetch");
            continue;
        }

        match normalize_response(sequence, address, client, &response.payload) {
            Ok(batch) if batch.data.is_empty() => {
                debug!(%address, "no new records");
            }
            Ok(batch) => {
                info!(
                    %address,
                    table = %batch.db_table,
                    rows = batch.row_count(),
                    columns = batch.col_names.len(),
                    "normalized datalogger payload"
                );
                batches.push(batch);
            }
            Err(e) => {
                // Disconnected loggers answer with a minimal body; retried next run
                warn!(%address, error = %e, "skipping malformed payload");
            }
        }
    }

    batches
}

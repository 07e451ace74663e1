use uuid::Uuid;

const IDENTIFIER_LENGTH: usize = 36;

/// Item ids are canonical hyphenated UUIDs, e.g. `67e55044-10b1-426f-9247-bb680e5fe0c8`.
pub fn is_valid_identifier(id: &str) -> bool {
    id.len() == IDENTIFIER_LENGTH && Uuid::parse_str(id).is_ok()
}

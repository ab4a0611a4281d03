use serde::{Deserialize, Deserializer};

pub const DEFAULT_PAGE_SIZE: u32 = 50;
pub const MAX_PAGE_SIZE: u32 = 1000;

/// Offset pagination shared by list endpoints. Values below one are
/// normalized so downstream services never see a zero page or size, and
/// the size is capped so a query string cannot request unbounded pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub page_num: u32,
    pub page_size: u32,
}

impl Pagination {
    pub fn new(page_num: u32, page_size: u32) -> Self {
        Self {
            page_num: if page_num < 1 { 1 } else { page_num },
            page_size: if page_size < 1 {
                DEFAULT_PAGE_SIZE
            } else {
                page_size.min(MAX_PAGE_SIZE)
            },
        }
    }

    // widened multiply: u32 * u32 can exceed u32 even with the size cap
    pub fn offset(&self) -> usize {
        (self.page_num as u64 - 1).saturating_mul(self.page_size as u64) as usize
    }
}

impl Default for Pagination {
    fn default() -> Self {
        Self::new(1, DEFAULT_PAGE_SIZE)
    }
}

/// Query-string form used by handlers; both fields optional.
///
/// Values pass through a string-tolerant deserializer because these params
/// are usually flattened into a larger query struct, where serde buffers
/// every value as text before it reaches the field.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct PageParams {
    #[serde(default, deserialize_with = "u32_from_query")]
    pub page_num: u32,
    #[serde(default, deserialize_with = "u32_from_query")]
    pub page_size: u32,
}

fn u32_from_query<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    struct QueryU32;

    impl serde::de::Visitor<'_> for QueryU32 {
        type Value = u32;

        fn expecting(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.write_str("a non-negative page value")
        }

        fn visit_u64<E: serde::de::Error>(self, v: u64) -> Result<u32, E> {
            u32::try_from(v).map_err(E::custom)
        }

        fn visit_str<E: serde::de::Error>(self, v: &str) -> Result<u32, E> {
            v.parse().map_err(E::custom)
        }
    }

    deserializer.deserialize_any(QueryU32)
}

impl From<PageParams> for Pagination {
    fn from(params: PageParams) -> Self {
        Pagination::new(params.page_num, params.page_size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_zero_values() {
        let p = Pagination::new(0, 0);
        assert_eq!(p.page_num, 1);
        assert_eq!(p.page_size, DEFAULT_PAGE_SIZE);
        assert_eq!(p.offset(), 0);
    }

    #[test]
    fn keeps_explicit_values() {
        let p = Pagination::new(3, 20);
        assert_eq!(p.offset(), 40);
    }

    #[test]
    fn extreme_query_values_do_not_overflow() {
        let p = Pagination::new(u32::MAX, u32::MAX);
        assert_eq!(p.page_size, MAX_PAGE_SIZE);
        assert_eq!(
            p.offset(),
            ((u32::MAX as u64 - 1) * MAX_PAGE_SIZE as u64) as usize
        );
    }
}

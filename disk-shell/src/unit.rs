use typed_bytesize::ByteSizeIec;

/// 尺寸单位
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unit {
    Byte,
    Kibi,
    Mebi,
}

impl Unit {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_uppercase().as_str() {
            "B" => Some(Self::Byte),
            "K" => Some(Self::Kibi),
            "M" => Some(Self::Mebi),
            _ => None,
        }
    }

    pub fn bytes(self, count: u64) -> u64 {
        match self {
            Self::Byte => count,
            Self::Kibi => ByteSizeIec::kib(count).0,
            Self::Mebi => ByteSizeIec::mib(count).0,
        }
    }
}

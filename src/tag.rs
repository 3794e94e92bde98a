/// Bitmask of the tags a client is on, or a monitor is viewing.
pub type TagMask = u32;

/// Tags are bits of a [TagMask]; one bit is kept free so masks stay positive.
pub const MAX_TAGS: usize = 31;
/// Longest tag name, including the terminator the bar used to reserve.
pub const MAX_TAGLEN: usize = 16;

/// Mask with one bit for every configured tag.
pub fn tag_mask(num_tags: usize) -> TagMask {
    let n = num_tags.min(MAX_TAGS);
    ((1u64 << n) - 1) as TagMask
}

/// Bit for a single tag index.
pub fn tag_bit(index: usize) -> TagMask {
    if index >= MAX_TAGS {
        0
    } else {
        1 << index
    }
}

/// Index of the lowest set tag in a mask.
pub fn first_tag(mask: TagMask) -> Option<usize> {
    if mask == 0 {
        None
    } else {
        Some(mask.trailing_zeros() as usize)
    }
}

/// The user visible names of the configured tags.
#[derive(Debug, Clone, PartialEq)]
pub struct TagNames {
    names: Vec<String>,
}

impl TagNames {
    pub fn new(names: impl IntoIterator<Item = impl Into<String>>) -> TagNames {
        let mut names: Vec<String> = names.into_iter().map(|n| n.into()).collect();
        if names.len() > MAX_TAGS {
            warn!("only the first {} of {} tags are usable", MAX_TAGS, names.len());
            names.truncate(MAX_TAGS);
        }
        if names.is_empty() {
            names.push("1".to_string());
        }
        TagNames { names }
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn mask(&self) -> TagMask {
        tag_mask(self.names.len())
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Rename every tag in `mask`, truncating to the maximum tag length.
    pub fn rename(&mut self, mask: TagMask, name: &str) {
        let name: String = name.chars().take(MAX_TAGLEN - 1).collect();
        for (i, tag) in self.names.iter_mut().enumerate() {
            if mask & tag_bit(i) != 0 {
                *tag = name.clone();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn masks_cover_configured_tags() {
        assert_eq!(tag_mask(9), 0x1ff);
        assert_eq!(tag_mask(31), 0x7fff_ffff);
        assert_eq!(tag_mask(40), 0x7fff_ffff);
    }

    #[test]
    fn first_tag_of_mask() {
        assert_eq!(first_tag(0b1000), Some(3));
        assert_eq!(first_tag(0), None);
    }

    #[test]
    fn rename_truncates_and_hits_every_selected_tag() {
        let mut tags = TagNames::new(vec!["1", "2", "3"]);
        tags.rename(0b101, "a-very-long-tag-name");
        assert_eq!(tags.names()[0], "a-very-long-tag");
        assert_eq!(tags.names()[1], "2");
        assert_eq!(tags.names()[2], "a-very-long-tag");
    }
}

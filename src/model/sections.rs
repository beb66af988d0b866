//! Flattening of paginated item lists into alphabetically sectioned display lists
//!
//! The server is expected to have sorted the items by the same key the
//! section letter is derived from; headers are emitted in traversal order and
//! nothing here re-sorts.

use std::collections::BTreeSet;

use super::item::{Item, ItemKind};
use super::types::ItemSortBy;

/// Section used for anything that does not start with `A`-`Z`
pub const NON_ALPHA_SECTION: char = '#';

/// Which field a section letter is derived from
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum SectionMode {
    /// Track name for tracks, sort name for everything else
    #[default]
    ByName,
    ByAlbum,
    ByArtist,
}

impl SectionMode {
    /// Sectioning that matches a sort key, if that sort is alphabetical
    pub fn for_sort(sort_by: ItemSortBy) -> Option<Self> {
        match sort_by {
            ItemSortBy::Name | ItemSortBy::SortName => Some(Self::ByName),
            ItemSortBy::Album => Some(Self::ByAlbum),
            ItemSortBy::Artist => Some(Self::ByArtist),
            _ => None,
        }
    }

    fn first_char(self, item: &Item) -> Option<char> {
        match self {
            Self::ByName if item.kind == ItemKind::Audio => {
                item.name.as_deref().and_then(|name| name.trim().chars().next())
            }
            Self::ByName => item.sort_name.as_deref().and_then(|name| name.chars().next()),
            Self::ByArtist => item.primary_artist().and_then(|name| name.chars().next()),
            Self::ByAlbum => item
                .album
                .as_deref()
                .and_then(|album| album.trim().chars().next()),
        }
    }
}

/// One row of a flattened list: a section header or an item
#[derive(Clone, Debug, PartialEq)]
pub enum ListEntry {
    Section(char),
    Item(Item),
}

impl ListEntry {
    pub fn as_item(&self) -> Option<&Item> {
        match self {
            Self::Item(item) => Some(item),
            Self::Section(_) => None,
        }
    }

    pub fn as_section(&self) -> Option<char> {
        match self {
            Self::Section(letter) => Some(*letter),
            Self::Item(_) => None,
        }
    }
}

/// Section letter for an item: uppercase `A`-`Z`, or `#`
pub fn section_letter(item: &Item, mode: SectionMode) -> char {
    mode.first_char(item)
        .and_then(|c| c.to_uppercase().next())
        .filter(char::is_ascii_uppercase)
        .unwrap_or(NON_ALPHA_SECTION)
}

/// Flatten pages into one list, inserting a header before the first item of
/// each newly seen letter.
///
/// `letters` is overwritten with every distinct letter encountered, for the
/// jump-to-letter control.
pub fn flatten_pages(
    pages: &[Vec<Item>],
    mode: SectionMode,
    letters: &mut BTreeSet<char>,
) -> Vec<ListEntry> {
    let mut seen = BTreeSet::new();
    let mut entries = Vec::with_capacity(pages.iter().map(Vec::len).sum::<usize>() + 27);

    for item in pages.iter().flatten() {
        let letter = section_letter(item, mode);
        if seen.insert(letter) {
            entries.push(ListEntry::Section(letter));
        }
        entries.push(ListEntry::Item(item.clone()));
    }

    *letters = seen;
    entries
}

/// Flatten without headers
pub fn flatten_plain(pages: &[Vec<Item>]) -> Vec<ListEntry> {
    pages
        .iter()
        .flatten()
        .cloned()
        .map(ListEntry::Item)
        .collect()
}

/// Flatten with headers when `sort_by` is alphabetical, plainly otherwise.
/// `letters` is cleared for non-alphabetical sorts.
pub fn flatten_for_sort(
    pages: &[Vec<Item>],
    sort_by: ItemSortBy,
    letters: &mut BTreeSet<char>,
) -> Vec<ListEntry> {
    match SectionMode::for_sort(sort_by) {
        Some(mode) => flatten_pages(pages, mode, letters),
        None => {
            letters.clear();
            flatten_plain(pages)
        }
    }
}

/// Index of the header to scroll to for `target`: the first section whose
/// letter sorts at or after the target, else the last section.
pub fn jump_to_letter(entries: &[ListEntry], target: char) -> Option<usize> {
    let target = target.to_ascii_uppercase();
    let mut letters: Vec<char> = entries.iter().filter_map(ListEntry::as_section).collect();
    letters.sort_unstable();

    let letter = letters
        .iter()
        .find(|letter| **letter >= target)
        .or(letters.last())?;

    entries
        .iter()
        .position(|entry| entry.as_section() == Some(*letter))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn track(name: &str) -> Item {
        Item {
            id: name.to_string(),
            name: Some(name.to_string()),
            kind: ItemKind::Audio,
            ..Default::default()
        }
    }

    fn album(sort_name: &str) -> Item {
        Item {
            id: sort_name.to_string(),
            name: Some(sort_name.to_string()),
            sort_name: Some(sort_name.to_string()),
            kind: ItemKind::MusicAlbum,
            ..Default::default()
        }
    }

    fn items_of(entries: &[ListEntry]) -> Vec<Item> {
        entries.iter().filter_map(ListEntry::as_item).cloned().collect()
    }

    #[test]
    fn inserts_headers_before_first_item_of_each_letter() {
        let pages = vec![
            vec![track("Alpha"), track("apple"), track("Bravo")],
            vec![track("bongo"), track("9 Lives"), track("Charlie")],
        ];
        let mut letters = BTreeSet::new();
        let entries = flatten_pages(&pages, SectionMode::ByName, &mut letters);

        let rendered: Vec<String> = entries
            .iter()
            .map(|e| match e {
                ListEntry::Section(c) => format!("[{c}]"),
                ListEntry::Item(i) => i.display_name().to_string(),
            })
            .collect();
        assert_eq!(
            rendered,
            ["[A]", "Alpha", "apple", "[B]", "Bravo", "bongo", "[#]", "9 Lives", "[C]", "Charlie"]
        );
        assert_eq!(letters, BTreeSet::from(['#', 'A', 'B', 'C']));
    }

    #[test]
    fn track_names_are_trimmed_but_sort_names_are_not() {
        assert_eq!(section_letter(&track("  zebra"), SectionMode::ByName), 'Z');
        assert_eq!(section_letter(&album(" zebra"), SectionMode::ByName), '#');
        let unsorted = Item { kind: ItemKind::MusicAlbum, name: Some("Named".into()), ..Default::default() };
        assert_eq!(section_letter(&unsorted, SectionMode::ByName), '#');
    }

    #[test]
    fn accented_and_symbol_names_fall_into_hash() {
        assert_eq!(section_letter(&track("Éclair"), SectionMode::ByName), '#');
        assert_eq!(section_letter(&track("(Intro)"), SectionMode::ByName), '#');
        assert_eq!(section_letter(&track(""), SectionMode::ByName), '#');
    }

    #[test]
    fn artist_mode_without_any_artist_is_hash() {
        let item = track("Something");
        assert_eq!(section_letter(&item, SectionMode::ByArtist), '#');

        let with_artist = Item { artists: vec!["moby".into()], ..track("x") };
        assert_eq!(section_letter(&with_artist, SectionMode::ByArtist), 'M');

        let album_artist_wins = Item {
            album_artist: Some("Queen".into()),
            artists: vec!["moby".into()],
            ..track("x")
        };
        assert_eq!(section_letter(&album_artist_wins, SectionMode::ByArtist), 'Q');
    }

    #[test]
    fn album_mode_uses_album_field() {
        let item = Item { album: Some(" blue".into()), ..track("Zed") };
        assert_eq!(section_letter(&item, SectionMode::ByAlbum), 'B');
        assert_eq!(section_letter(&track("Zed"), SectionMode::ByAlbum), '#');
    }

    #[test]
    fn unsorted_input_keeps_single_header_per_letter() {
        let pages = vec![vec![track("Apple"), track("Banana"), track("Avocado")]];
        let mut letters = BTreeSet::new();
        let entries = flatten_pages(&pages, SectionMode::ByName, &mut letters);
        let headers: Vec<char> = entries.iter().filter_map(ListEntry::as_section).collect();
        assert_eq!(headers, ['A', 'B']);
        assert_eq!(entries.len(), 5);
    }

    #[test]
    fn non_alphabetical_sort_flattens_without_headers() {
        let pages = vec![vec![track("b")], vec![track("a")]];
        let mut letters = BTreeSet::from(['Z']);
        let entries = flatten_for_sort(&pages, ItemSortBy::PlayCount, &mut letters);
        assert!(entries.iter().all(|e| e.as_item().is_some()));
        assert!(letters.is_empty());
    }

    #[test]
    fn jump_picks_first_section_at_or_after_target() {
        let pages = vec![vec![track("1999"), track("Apple"), track("Delta"), track("Kilo")]];
        let mut letters = BTreeSet::new();
        let entries = flatten_pages(&pages, SectionMode::ByName, &mut letters);

        assert_eq!(jump_to_letter(&entries, 'a'), Some(2));
        assert_eq!(jump_to_letter(&entries, 'B'), Some(4));
        assert_eq!(jump_to_letter(&entries, '#'), Some(0));
        // Nothing at or after Z: fall back to the last section
        assert_eq!(jump_to_letter(&entries, 'Z'), Some(6));
        assert_eq!(jump_to_letter(&[], 'A'), None);
    }

    fn arb_item() -> impl Strategy<Value = Item> {
        (
            "[ a-zA-Z0-9#é]{0,6}",
            proptest::option::of("[a-zA-Z ]{0,4}"),
            any::<bool>(),
        )
            .prop_map(|(name, artist, is_track)| Item {
                id: name.clone(),
                sort_name: Some(name.clone()),
                name: Some(name),
                album_artist: artist.clone(),
                album: artist,
                kind: if is_track { ItemKind::Audio } else { ItemKind::MusicArtist },
                ..Default::default()
            })
    }

    fn arb_mode() -> impl Strategy<Value = SectionMode> {
        prop_oneof![
            Just(SectionMode::ByName),
            Just(SectionMode::ByAlbum),
            Just(SectionMode::ByArtist),
        ]
    }

    proptest! {
        /// Dropping headers gives back exactly the input items, in order.
        #[test]
        fn flatten_preserves_items(
            pages in proptest::collection::vec(proptest::collection::vec(arb_item(), 0..8), 0..5),
            mode in arb_mode(),
        ) {
            let mut letters = BTreeSet::new();
            let entries = flatten_pages(&pages, mode, &mut letters);
            let expected: Vec<Item> = pages.iter().flatten().cloned().collect();
            prop_assert_eq!(items_of(&entries), expected);
        }

        /// Headers are exactly the distinct letters, each once, right before
        /// the first item that carries it.
        #[test]
        fn headers_match_distinct_letters(
            pages in proptest::collection::vec(proptest::collection::vec(arb_item(), 0..8), 0..5),
            mode in arb_mode(),
        ) {
            let mut letters = BTreeSet::new();
            let entries = flatten_pages(&pages, mode, &mut letters);

            let expected: BTreeSet<char> = pages
                .iter()
                .flatten()
                .map(|item| section_letter(item, mode))
                .collect();
            let headers: Vec<char> = entries.iter().filter_map(ListEntry::as_section).collect();

            prop_assert_eq!(headers.len(), expected.len());
            prop_assert_eq!(headers.iter().copied().collect::<BTreeSet<_>>(), expected.clone());
            prop_assert_eq!(letters, expected);

            for (index, entry) in entries.iter().enumerate() {
                if let ListEntry::Section(letter) = entry {
                    let next = entries.get(index + 1).and_then(ListEntry::as_item);
                    prop_assert!(next.is_some());
                    prop_assert_eq!(section_letter(next.unwrap(), mode), *letter);
                    let earlier = entries[..index]
                        .iter()
                        .filter_map(ListEntry::as_item)
                        .any(|item| section_letter(item, mode) == *letter);
                    prop_assert!(!earlier);
                }
            }
        }
    }
}

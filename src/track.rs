use std::collections::HashSet;
use std::fmt;

/// One source playlist entry, reduced to what the search needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Track {
    pub artist: String,
    pub name: String,
}

impl Track {
    pub fn new(artist: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            artist: artist.into(),
            name: name.into(),
        }
    }

    /// Case-insensitive identity used for deduplication.
    pub fn normalized_key(&self) -> String {
        format!("{} - {}", self.artist.to_lowercase(), self.name.to_lowercase())
    }

    /// Search key sent to the destination service, case preserved.
    pub fn query(&self) -> MatchQuery {
        MatchQuery(format!("{} - {}", self.artist, self.name))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MatchQuery(String);

impl MatchQuery {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for MatchQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Ordered tracks with no two entries sharing a normalized key.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrackList {
    tracks: Vec<Track>,
}

impl TrackList {
    /// Build a list keeping the first occurrence of every normalized key.
    pub fn dedup(tracks: impl IntoIterator<Item = Track>) -> Self {
        let mut seen = HashSet::new();
        let tracks = tracks
            .into_iter()
            .filter(|track| seen.insert(track.normalized_key()))
            .collect();

        Self { tracks }
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Track> {
        self.tracks.iter()
    }
}

impl<'a> IntoIterator for &'a TrackList {
    type Item = &'a Track;
    type IntoIter = std::slice::Iter<'a, Track>;

    fn into_iter(self) -> Self::IntoIter {
        self.tracks.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_preserves_case() {
        let track = Track::new("Queen", "Bohemian Rhapsody");

        assert_eq!(track.query().as_str(), "Queen - Bohemian Rhapsody");
        assert_eq!(track.normalized_key(), "queen - bohemian rhapsody");
    }

    #[test]
    fn dedup_ignores_case() {
        let list = TrackList::dedup(vec![
            Track::new("Queen", "Bohemian Rhapsody"),
            Track::new("Queen", "bohemian rhapsody"),
        ]);

        assert_eq!(list.len(), 1);
        assert_eq!(list.iter().next().unwrap().name, "Bohemian Rhapsody");
    }

    #[test]
    fn dedup_keeps_first_occurrence_position() {
        let list = TrackList::dedup(vec![
            Track::new("A", "one"),
            Track::new("B", "two"),
            Track::new("a", "ONE"),
            Track::new("C", "three"),
        ]);

        let names: Vec<&str> = list.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["one", "two", "three"]);
    }

    #[test]
    fn same_title_by_different_artists_is_kept() {
        let list = TrackList::dedup(vec![
            Track::new("Leonard Cohen", "Hallelujah"),
            Track::new("Jeff Buckley", "Hallelujah"),
        ]);

        assert_eq!(list.len(), 2);
    }
}

//! In-memory playlist store
//!
//! Owns every playlist, song and bookmark for the session. Pure data: nothing
//! here touches a media element or an audio engine, and nothing is persisted.
//!
//! Invariants enforced at this boundary:
//! - the default playlist always exists and cannot be deleted
//! - a freshly created playlist id is usable immediately
//! - smart playlists are materialized once and never auto-update

use crate::error::{CoreError, Result};
use crate::types::{
    Bookmark, BookmarkId, Playlist, PlaylistId, SmartCriteria, Song, SongId, DEFAULT_PLAYLIST_ID,
};
use chrono::{DateTime, Utc};
use std::collections::HashSet;

/// Playlists, songs and bookmarks for one session
#[derive(Debug, Clone)]
pub struct PlaylistStore {
    playlists: Vec<Playlist>,
    bookmarks: Vec<Bookmark>,
}

impl Default for PlaylistStore {
    fn default() -> Self {
        Self::new("My Playlist")
    }
}

impl PlaylistStore {
    /// Create a store holding only the default playlist
    pub fn new(default_name: impl Into<String>) -> Self {
        Self {
            playlists: vec![Playlist::with_id(
                PlaylistId::new(DEFAULT_PLAYLIST_ID),
                default_name,
            )],
            bookmarks: Vec::new(),
        }
    }

    // ===== Playlists =====

    /// All playlists in creation order (default first)
    pub fn playlists(&self) -> &[Playlist] {
        &self.playlists
    }

    /// Look up a playlist
    pub fn playlist(&self, id: &PlaylistId) -> Option<&Playlist> {
        self.playlists.iter().find(|p| &p.id == id)
    }

    /// Whether a playlist exists
    pub fn contains_playlist(&self, id: &PlaylistId) -> bool {
        self.playlist(id).is_some()
    }

    /// The always-present default playlist
    pub fn default_playlist(&self) -> &Playlist {
        // The default playlist is created in `new` and can never be removed
        &self.playlists[0]
    }

    /// Resolve a playlist id, falling back to the default playlist
    pub fn resolve(&self, id: &PlaylistId) -> &Playlist {
        self.playlist(id).unwrap_or_else(|| self.default_playlist())
    }

    /// Create an empty playlist and return its id
    pub fn create_playlist(&mut self, name: impl Into<String>) -> PlaylistId {
        let playlist = Playlist::new(name);
        let id = playlist.id.clone();
        tracing::debug!("Created playlist {} ({})", playlist.name, id);
        self.playlists.push(playlist);
        id
    }

    /// Rename a playlist
    pub fn rename_playlist(&mut self, id: &PlaylistId, name: impl Into<String>) -> Result<()> {
        let playlist = self.playlist_mut(id)?;
        playlist.name = name.into();
        Ok(())
    }

    /// Delete a playlist, returning it
    ///
    /// The default playlist is rejected with `DefaultPlaylistProtected`.
    pub fn delete_playlist(&mut self, id: &PlaylistId) -> Result<Playlist> {
        if id.as_str() == DEFAULT_PLAYLIST_ID {
            return Err(CoreError::DefaultPlaylistProtected);
        }

        let pos = self
            .playlists
            .iter()
            .position(|p| &p.id == id)
            .ok_or_else(|| CoreError::PlaylistNotFound(id.clone()))?;

        Ok(self.playlists.remove(pos))
    }

    // ===== Songs =====

    /// Append a song to a playlist
    pub fn add_song(&mut self, playlist_id: &PlaylistId, song: Song) -> Result<()> {
        self.playlist_mut(playlist_id)?.songs.push(song);
        Ok(())
    }

    /// Append several songs to a playlist, returning how many were added
    pub fn add_songs(&mut self, playlist_id: &PlaylistId, songs: Vec<Song>) -> Result<usize> {
        let playlist = self.playlist_mut(playlist_id)?;
        let count = songs.len();
        playlist.songs.extend(songs);
        Ok(count)
    }

    /// Remove every entry of a song from one playlist
    ///
    /// Returns the first removed entry.
    pub fn remove_song(&mut self, playlist_id: &PlaylistId, song_id: &SongId) -> Result<Song> {
        let playlist = self.playlist_mut(playlist_id)?;

        let mut removed = None;
        playlist.songs.retain(|song| {
            if &song.id == song_id {
                if removed.is_none() {
                    removed = Some(song.clone());
                }
                false
            } else {
                true
            }
        });

        removed.ok_or_else(|| CoreError::SongNotFound(song_id.clone()))
    }

    /// Every song entry across all playlists (copies included)
    pub fn songs(&self) -> impl Iterator<Item = &Song> {
        self.playlists.iter().flat_map(|p| p.songs.iter())
    }

    /// The song corpus: every distinct song, first occurrence wins
    pub fn corpus(&self) -> Vec<&Song> {
        let mut seen = HashSet::new();
        self.songs().filter(|s| seen.insert(&s.id)).collect()
    }

    /// Find a song by id in any playlist
    pub fn find_song(&self, song_id: &SongId) -> Option<&Song> {
        self.songs().find(|s| &s.id == song_id)
    }

    /// Whether any playlist still references a media locator
    pub fn references_url(&self, url: &str) -> bool {
        self.songs().any(|s| s.url == url)
    }

    /// Flip the favorite flag on every copy of a song
    ///
    /// Returns the new flag, or `None` if the song does not exist.
    pub fn toggle_favorite(&mut self, song_id: &SongId) -> Option<bool> {
        let current = self.find_song(song_id)?.is_favorite;
        let next = !current;
        self.update_song(song_id, |song| song.is_favorite = next);
        Some(next)
    }

    /// Replace lyrics on every copy of a song
    pub fn update_lyrics(&mut self, song_id: &SongId, lyrics: impl Into<String>) -> bool {
        let lyrics = lyrics.into();
        self.update_song(song_id, |song| song.lyrics = Some(lyrics.clone())) > 0
    }

    /// Record the decoded duration on every copy of a song
    pub fn set_song_duration(&mut self, song_id: &SongId, duration: f64) -> bool {
        if !duration.is_finite() || duration < 0.0 {
            return false;
        }
        self.update_song(song_id, |song| song.duration = duration) > 0
    }

    /// Count a playback start on every copy of a song
    pub fn record_play(&mut self, song_id: &SongId, at: DateTime<Utc>) -> bool {
        self.update_song(song_id, |song| {
            song.play_count = song.play_count.saturating_add(1);
            song.last_played = Some(at);
        }) > 0
    }

    // ===== Smart playlists =====

    /// Materialize a smart playlist from the corpus and return its id
    ///
    /// `default_limit` bounds `recent` and `mostPlayed` when the criteria carry no limit.
    pub fn create_smart_playlist(
        &mut self,
        criteria: SmartCriteria,
        default_limit: usize,
    ) -> PlaylistId {
        let songs = self.smart_filter(&criteria, default_limit);
        let mut playlist = Playlist::new(criteria.playlist_name());
        playlist.songs = songs;
        playlist.smart_criteria = Some(criteria);

        let id = playlist.id.clone();
        tracing::debug!(
            "Created smart playlist {} with {} songs",
            playlist.name,
            playlist.songs.len()
        );
        self.playlists.push(playlist);
        id
    }

    /// Apply smart criteria to the corpus without storing anything
    pub fn smart_filter(&self, criteria: &SmartCriteria, default_limit: usize) -> Vec<Song> {
        let corpus = self.corpus();

        let songs: Vec<&Song> = match criteria {
            SmartCriteria::Favorites => corpus.into_iter().filter(|s| s.is_favorite).collect(),
            SmartCriteria::Recent { limit } => {
                let mut recent: Vec<&Song> = corpus
                    .into_iter()
                    .filter(|s| s.last_played.is_some())
                    .collect();
                recent.sort_by(|a, b| b.last_played.cmp(&a.last_played));
                recent.truncate(limit.unwrap_or(default_limit));
                recent
            }
            SmartCriteria::Genre { value } => {
                let needle = value.to_lowercase();
                corpus
                    .into_iter()
                    .filter(|s| matches_field(s.genre.as_deref(), &needle))
                    .collect()
            }
            SmartCriteria::Mood { value } => {
                let needle = value.to_lowercase();
                corpus
                    .into_iter()
                    .filter(|s| matches_field(s.mood.as_deref(), &needle))
                    .collect()
            }
            SmartCriteria::MostPlayed { limit } => {
                let mut ranked = corpus;
                ranked.sort_by(|a, b| b.play_count.cmp(&a.play_count));
                ranked.truncate(limit.unwrap_or(default_limit));
                ranked
            }
        };

        songs.into_iter().cloned().collect()
    }

    // ===== Bookmarks =====

    /// All bookmarks in creation order
    pub fn bookmarks(&self) -> &[Bookmark] {
        &self.bookmarks
    }

    /// Store a bookmark and return its id
    pub fn add_bookmark(&mut self, bookmark: Bookmark) -> BookmarkId {
        let id = bookmark.id.clone();
        self.bookmarks.push(bookmark);
        id
    }

    /// Remove a bookmark
    pub fn remove_bookmark(&mut self, id: &BookmarkId) -> Result<Bookmark> {
        let pos = self
            .bookmarks
            .iter()
            .position(|b| &b.id == id)
            .ok_or_else(|| CoreError::BookmarkNotFound(id.clone()))?;
        Ok(self.bookmarks.remove(pos))
    }

    /// Resolve a bookmark to its song and position
    ///
    /// A bookmark whose song was removed resolves to `None`.
    pub fn resolve_bookmark(&self, id: &BookmarkId) -> Option<(&Song, f64)> {
        let bookmark = self.bookmarks.iter().find(|b| &b.id == id)?;
        let song = self.find_song(&bookmark.song_id)?;
        Some((song, bookmark.position))
    }

    // ===== Internal =====

    fn playlist_mut(&mut self, id: &PlaylistId) -> Result<&mut Playlist> {
        self.playlists
            .iter_mut()
            .find(|p| &p.id == id)
            .ok_or_else(|| CoreError::PlaylistNotFound(id.clone()))
    }

    fn update_song(&mut self, song_id: &SongId, mut f: impl FnMut(&mut Song)) -> usize {
        let mut updated = 0;
        for song in self
            .playlists
            .iter_mut()
            .flat_map(|p| p.songs.iter_mut())
            .filter(|s| &s.id == song_id)
        {
            f(song);
            updated += 1;
        }
        updated
    }
}

fn matches_field(field: Option<&str>, needle: &str) -> bool {
    field.is_some_and(|value| value.to_lowercase().contains(needle))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn default_id() -> PlaylistId {
        PlaylistId::new(DEFAULT_PLAYLIST_ID)
    }

    fn song(name: &str) -> Song {
        Song::new(name, format!("blob:{name}"))
    }

    fn names(songs: &[Song]) -> Vec<&str> {
        songs.iter().map(|s| s.name.as_str()).collect()
    }

    #[test]
    fn starts_with_default_playlist() {
        let store = PlaylistStore::new("My Playlist");
        assert_eq!(store.playlists().len(), 1);
        assert!(store.default_playlist().is_default());
        assert_eq!(store.default_playlist().name, "My Playlist");
    }

    #[test]
    fn default_playlist_cannot_be_deleted() {
        let mut store = PlaylistStore::default();
        assert_eq!(
            store.delete_playlist(&default_id()),
            Err(CoreError::DefaultPlaylistProtected)
        );
        assert_eq!(store.playlists().len(), 1);
    }

    #[test]
    fn created_playlist_is_usable_immediately() {
        let mut store = PlaylistStore::default();
        let id = store.create_playlist("Road Trip");
        store.add_song(&id, song("A")).unwrap();

        assert_eq!(store.playlist(&id).unwrap().len(), 1);

        let deleted = store.delete_playlist(&id).unwrap();
        assert_eq!(deleted.name, "Road Trip");
        assert!(!store.contains_playlist(&id));
        assert!(matches!(
            store.delete_playlist(&id),
            Err(CoreError::PlaylistNotFound(_))
        ));
    }

    #[test]
    fn resolve_falls_back_to_default() {
        let store = PlaylistStore::default();
        assert!(store.resolve(&PlaylistId::new("gone")).is_default());
    }

    #[test]
    fn remove_song_removes_every_entry() {
        let mut store = PlaylistStore::default();
        let a = song("A");
        let a_id = a.id.clone();
        store.add_song(&default_id(), a.clone()).unwrap();
        store.add_song(&default_id(), song("B")).unwrap();
        store.add_song(&default_id(), a).unwrap();

        let removed = store.remove_song(&default_id(), &a_id).unwrap();
        assert_eq!(removed.name, "A");
        assert_eq!(names(&store.default_playlist().songs), vec!["B"]);
        assert!(matches!(
            store.remove_song(&default_id(), &a_id),
            Err(CoreError::SongNotFound(_))
        ));
    }

    #[test]
    fn annotations_update_every_copy() {
        let mut store = PlaylistStore::default();
        let other = store.create_playlist("Other");
        let a = song("A");
        let a_id = a.id.clone();
        store.add_song(&default_id(), a.clone()).unwrap();
        store.add_song(&other, a).unwrap();

        assert_eq!(store.toggle_favorite(&a_id), Some(true));
        assert!(store.update_lyrics(&a_id, "la la"));
        assert!(store.set_song_duration(&a_id, 212.5));

        for entry in store.songs() {
            assert!(entry.is_favorite);
            assert_eq!(entry.lyrics.as_deref(), Some("la la"));
            assert_eq!(entry.duration, 212.5);
        }

        assert_eq!(store.toggle_favorite(&SongId::new("missing")), None);
        assert!(!store.set_song_duration(&a_id, f64::NAN));
    }

    #[test]
    fn favorites_preserve_order() {
        let mut store = PlaylistStore::default();
        let mut a = song("A");
        a.is_favorite = true;
        let b = song("B");
        let mut c = song("C");
        c.is_favorite = true;
        store.add_songs(&default_id(), vec![a, b, c]).unwrap();

        let id = store.create_smart_playlist(SmartCriteria::Favorites, 25);
        let playlist = store.playlist(&id).unwrap();

        assert_eq!(names(&playlist.songs), vec!["A", "C"]);
        assert!(playlist.is_smart_playlist());
        assert_eq!(playlist.name, "Smart: favorites");
    }

    #[test]
    fn recent_sorts_newest_first_and_truncates() {
        let mut store = PlaylistStore::default();
        let mut songs = Vec::new();
        for (name, hour) in [("A", 1), ("B", 3), ("C", 2)] {
            let mut s = song(name);
            s.last_played = Some(Utc.with_ymd_and_hms(2024, 1, 1, hour, 0, 0).unwrap());
            songs.push(s);
        }
        songs.push(song("Never"));
        store.add_songs(&default_id(), songs).unwrap();

        let recent = store.smart_filter(&SmartCriteria::Recent { limit: Some(2) }, 25);
        assert_eq!(names(&recent), vec!["B", "C"]);
    }

    #[test]
    fn genre_and_mood_match_case_insensitively() {
        let mut store = PlaylistStore::default();
        store
            .add_songs(
                &default_id(),
                vec![
                    song("A").with_genre("Acid Jazz"),
                    song("B").with_genre("Rock"),
                    song("C").with_genre("jazz fusion").with_mood("Chill"),
                    song("D"),
                ],
            )
            .unwrap();

        let jazz = store.smart_filter(
            &SmartCriteria::Genre {
                value: "JAZZ".to_string(),
            },
            25,
        );
        assert_eq!(names(&jazz), vec!["A", "C"]);

        let chill = store.smart_filter(
            &SmartCriteria::Mood {
                value: "chi".to_string(),
            },
            25,
        );
        assert_eq!(names(&chill), vec!["C"]);
    }

    #[test]
    fn most_played_is_stable_and_deduplicated() {
        let mut store = PlaylistStore::default();
        let other = store.create_playlist("Other");

        let mut a = song("A");
        a.play_count = 2;
        let b = song("B");
        let mut c = song("C");
        c.play_count = 5;
        let d = song("D");
        store
            .add_songs(&default_id(), vec![a.clone(), b, c, d])
            .unwrap();
        store.add_song(&other, a).unwrap();

        let top = store.smart_filter(&SmartCriteria::MostPlayed { limit: None }, 3);
        assert_eq!(names(&top), vec!["C", "A", "B"]);
    }

    #[test]
    fn record_play_feeds_recent() {
        let mut store = PlaylistStore::default();
        let a = song("A");
        let a_id = a.id.clone();
        store.add_song(&default_id(), a).unwrap();

        assert!(store.record_play(&a_id, Utc::now()));
        let found = store.find_song(&a_id).unwrap();
        assert_eq!(found.play_count, 1);
        assert!(found.last_played.is_some());

        let recent = store.smart_filter(&SmartCriteria::Recent { limit: None }, 25);
        assert_eq!(names(&recent), vec!["A"]);
    }

    #[test]
    fn bookmarks_resolve_weakly() {
        let mut store = PlaylistStore::default();
        let a = song("A");
        let a_id = a.id.clone();
        store.add_song(&default_id(), a).unwrap();

        let bookmark = store.add_bookmark(Bookmark::new(a_id.clone(), 42.0, "chorus"));
        let (resolved, position) = store.resolve_bookmark(&bookmark).unwrap();
        assert_eq!(resolved.name, "A");
        assert_eq!(position, 42.0);

        store.remove_song(&default_id(), &a_id).unwrap();
        assert!(store.resolve_bookmark(&bookmark).is_none());
        assert_eq!(store.bookmarks().len(), 1);

        store.remove_bookmark(&bookmark).unwrap();
        assert!(store.bookmarks().is_empty());
    }

    #[test]
    fn url_references_follow_removals() {
        let mut store = PlaylistStore::default();
        let other = store.create_playlist("Other");
        let a = song("A");
        let a_id = a.id.clone();
        store.add_song(&default_id(), a.clone()).unwrap();
        store.add_song(&other, a).unwrap();

        store.remove_song(&default_id(), &a_id).unwrap();
        assert!(store.references_url("blob:A"));

        store.delete_playlist(&other).unwrap();
        assert!(!store.references_url("blob:A"));
    }
}

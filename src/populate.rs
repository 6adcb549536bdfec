use std::path::Path;

use cliclack::log;

use crate::batch::{BatchSpec, Entry, TrackRequest};
use crate::config::Config;
use crate::error::Result;
use crate::remote::{PlaylistId, PlaylistService, SearchOutcome};

/// Counts of what happened during one run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct BatchReport {
    pub playlists_created: usize,
    pub playlists_skipped: usize,
    pub playlists_failed: usize,
    pub tracks_added: usize,
    pub tracks_skipped: usize,
    pub tracks_not_found: usize,
    pub tracks_failed: usize,
}

/// Drives the create / search / add loop over a batch.
///
/// A failure only ever skips the playlist or track it belongs to.
pub struct Populator<'a, S: ?Sized> {
    service: &'a S,
    config: &'a Config,
}

impl<'a, S> Populator<'a, S>
where
    S: PlaylistService + ?Sized,
{
    pub fn new(service: &'a S, config: &'a Config) -> Self {
        Self { service, config }
    }

    /// Load the configured input file and process it.
    ///
    /// A missing or malformed file is returned as an error before any remote call.
    pub async fn run(&self) -> Result<BatchReport> {
        self.run_file(&self.config.input_file).await
    }

    pub async fn run_file(&self, path: impl AsRef<Path>) -> Result<BatchReport> {
        let batch = BatchSpec::load(path)?;
        Ok(self.process(&batch).await)
    }

    pub async fn process(&self, batch: &BatchSpec) -> BatchReport {
        let mut report = BatchReport::default();

        if batch.is_empty() {
            console(log::warning("No playlists found in the input file"));
            return report;
        }

        for (block_id, request) in &batch.blocks {
            let (name, songs) = match request.validate() {
                Ok(valid) => valid,
                Err(skip) => {
                    console(log::warning(format!("Skipping block '{block_id}': {skip}.")));
                    report.playlists_skipped += 1;
                    continue;
                }
            };

            console(log::step(format!("Attempting to create playlist: '{name}'")));
            let playlist_id = match self
                .service
                .create_playlist(name, &self.config.description)
                .await
            {
                Ok(id) => id,
                Err(failure) => {
                    console(log::error(&failure));
                    console(log::error(format!("Failed to create playlist: {name}")));
                    report.playlists_failed += 1;
                    continue;
                }
            };
            console(log::success(format!(
                "Playlist '{name}' created with ID: {playlist_id}"
            )));
            report.playlists_created += 1;

            for track in songs {
                self.add_track(name, &playlist_id, track, &mut report).await;
            }
        }

        tracing::debug!(
            blocks = batch.len(),
            playlists_created = report.playlists_created,
            playlists_skipped = report.playlists_skipped,
            playlists_failed = report.playlists_failed,
            tracks_added = report.tracks_added,
            tracks_skipped = report.tracks_skipped,
            tracks_not_found = report.tracks_not_found,
            tracks_failed = report.tracks_failed,
            "batch finished"
        );
        report
    }

    async fn add_track(
        &self,
        playlist_name: &str,
        playlist_id: &PlaylistId,
        track: &Entry<TrackRequest>,
        report: &mut BatchReport,
    ) {
        let Some(query) = track.query() else {
            console(log::warning(format!(
                "Skipping song in playlist '{playlist_name}': Missing 'artist' or 'title'. Song data: {track}"
            )));
            report.tracks_skipped += 1;
            return;
        };

        let video = match self.service.search_video(&query).await {
            Ok(SearchOutcome::Found(video)) => {
                console(log::info(format!(
                    "Found video '{}' for query '{query}' with ID: {}",
                    video.title, video.id
                )));
                video
            }
            Ok(SearchOutcome::NoMatch) => {
                console(log::warning(format!(
                    "Could not find a video for: {query} (Playlist: '{playlist_name}')"
                )));
                report.tracks_not_found += 1;
                return;
            }
            Err(failure) => {
                console(log::error(&failure));
                report.tracks_failed += 1;
                return;
            }
        };

        match self.service.add_item(playlist_id, &video.id).await {
            Ok(()) => {
                console(log::info(format!(
                    "Added video '{}' to playlist '{playlist_id}'",
                    video.id
                )));
                report.tracks_added += 1;
            }
            Err(failure) => {
                console(log::error(&failure));
                report.tracks_failed += 1;
            }
        }
    }
}

/// Per-item lines are best effort; a broken console must not stop the batch.
fn console(written: std::io::Result<()>) {
    if let Err(e) = written {
        tracing::warn!(error = %e, "failed to write to the console");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::remote::{Operation, RemoteFailure, VideoId, VideoMatch};
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;
    use std::collections::{HashMap, HashSet};
    use std::io::Write;
    use std::sync::Mutex;

    #[derive(Debug, Clone, PartialEq, Eq)]
    enum Call {
        Create(String),
        Search(String),
        Add(String, String),
    }

    fn create(name: &str) -> Call {
        Call::Create(name.into())
    }

    fn search(query: &str) -> Call {
        Call::Search(query.into())
    }

    fn add(playlist: &str, video: &str) -> Call {
        Call::Add(playlist.into(), video.into())
    }

    /// In-memory service that records every call.
    ///
    /// Playlists get ids `P1`, `P2`, ... in creation order. Searches only match
    /// queries registered with `video`.
    #[derive(Default)]
    struct Recording {
        calls: Mutex<Vec<Call>>,
        videos: HashMap<String, String>,
        failing_searches: HashSet<String>,
        failing_creates: HashSet<String>,
        failing_adds: HashSet<String>,
    }

    impl Recording {
        fn video(mut self, query: &str, id: &str) -> Self {
            self.videos.insert(query.into(), id.into());
            self
        }

        fn fail_create(mut self, name: &str) -> Self {
            self.failing_creates.insert(name.into());
            self
        }

        fn fail_search(mut self, query: &str) -> Self {
            self.failing_searches.insert(query.into());
            self
        }

        fn fail_add(mut self, video: &str) -> Self {
            self.failing_adds.insert(video.into());
            self
        }

        fn calls(&self) -> Vec<Call> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl PlaylistService for Recording {
        async fn create_playlist(
            &self,
            name: &str,
            _description: &str,
        ) -> Result<PlaylistId, RemoteFailure> {
            let mut calls = self.calls.lock().unwrap();
            calls.push(create(name));
            if self.failing_creates.contains(name) {
                return Err(
                    RemoteFailure::new(Operation::CreatePlaylist, name, "forbidden")
                        .with_status(403),
                );
            }
            let created = calls
                .iter()
                .filter(|call| matches!(call, Call::Create(n) if !self.failing_creates.contains(n)))
                .count();
            Ok(PlaylistId(format!("P{created}")))
        }

        async fn search_video(&self, query: &str) -> Result<SearchOutcome, RemoteFailure> {
            self.calls.lock().unwrap().push(search(query));
            if self.failing_searches.contains(query) {
                return Err(RemoteFailure::new(
                    Operation::SearchVideo,
                    query,
                    "connection reset",
                ));
            }
            Ok(match self.videos.get(query) {
                Some(id) => SearchOutcome::Found(VideoMatch {
                    id: VideoId(id.clone()),
                    title: query.to_string(),
                }),
                None => SearchOutcome::NoMatch,
            })
        }

        async fn add_item(
            &self,
            playlist_id: &PlaylistId,
            video_id: &VideoId,
        ) -> Result<(), RemoteFailure> {
            self.calls
                .lock()
                .unwrap()
                .push(add(&playlist_id.0, &video_id.0));
            if self.failing_adds.contains(&video_id.0) {
                return Err(RemoteFailure::new(
                    Operation::AddItem,
                    format!("{video_id} -> {playlist_id}"),
                    "video not found",
                )
                .with_status(404));
            }
            Ok(())
        }
    }

    async fn process(service: &Recording, json: &str) -> BatchReport {
        let batch: BatchSpec = serde_json::from_str(json).unwrap();
        let config = Config::default();
        Populator::new(service, &config).process(&batch).await
    }

    #[tokio::test]
    async fn single_track_end_to_end() {
        let service = Recording::default().video("A - T", "V1");
        let report = process(
            &service,
            r#"{"B0": {"playlist_name": "Test", "songs": [{"artist":"A","title":"T"}]}}"#,
        )
        .await;

        assert_eq!(
            service.calls(),
            vec![create("Test"), search("A - T"), add("P1", "V1")]
        );
        assert_eq!(
            report,
            BatchReport {
                playlists_created: 1,
                tracks_added: 1,
                ..Default::default()
            }
        );
    }

    #[tokio::test]
    async fn empty_songs_makes_no_calls() {
        let service = Recording::default();
        let report = process(&service, r#"{"B0": {"playlist_name": "Test", "songs": []}}"#).await;

        assert!(service.calls().is_empty());
        assert_eq!(report.playlists_skipped, 1);
    }

    #[tokio::test]
    async fn missing_or_empty_name_is_never_created() {
        let service = Recording::default().video("A - T", "V1");
        let report = process(
            &service,
            r#"{
                "B0": {"songs": [{"artist":"A","title":"T"}]},
                "B1": {"playlist_name": "", "songs": [{"artist":"A","title":"T"}]},
                "B2": {"playlist_name": "Kept", "songs": [{"artist":"A","title":"T"}]}
            }"#,
        )
        .await;

        assert_eq!(
            service.calls(),
            vec![create("Kept"), search("A - T"), add("P1", "V1")]
        );
        assert_eq!(report.playlists_skipped, 2);
        assert_eq!(report.playlists_created, 1);
    }

    #[tokio::test]
    async fn incomplete_track_is_skipped_and_loop_continues() {
        let service = Recording::default().video("A - T", "V1").video("C - U", "V2");
        let report = process(
            &service,
            r#"{"B0": {"playlist_name": "Mix", "songs": [
                {"artist": "A"},
                {"artist":"A","title":"T"},
                {"title": "X"},
                {"artist": "", "title": "Y"},
                {"artist":"C","title":"U"}
            ]}}"#,
        )
        .await;

        assert_eq!(
            service.calls(),
            vec![
                create("Mix"),
                search("A - T"),
                add("P1", "V1"),
                search("C - U"),
                add("P1", "V2"),
            ]
        );
        assert_eq!(report.tracks_skipped, 3);
        assert_eq!(report.tracks_added, 2);
    }

    #[tokio::test]
    async fn badly_shaped_block_or_track_only_skips_itself() {
        let service = Recording::default().video("A - T", "V1").video("C - U", "V2");
        let report = process(
            &service,
            r#"{
                "B0": {"playlist_name": "Good", "songs": [{"artist": "A", "title": "T"}]},
                "B1": {"playlist_name": "Mixed", "songs": [
                    {"artist": 3, "title": "T"},
                    "A - T",
                    {"artist": "C", "title": "U"}
                ]},
                "B2": "not-an-object",
                "B3": {"playlist_name": "After", "songs": [{"artist": "A", "title": "T"}]}
            }"#,
        )
        .await;

        assert_eq!(
            service.calls(),
            vec![
                create("Good"),
                search("A - T"),
                add("P1", "V1"),
                create("Mixed"),
                search("C - U"),
                add("P2", "V2"),
                create("After"),
                search("A - T"),
                add("P3", "V1"),
            ]
        );
        assert_eq!(report.playlists_skipped, 1);
        assert_eq!(report.tracks_skipped, 2);
        assert_eq!(report.tracks_added, 3);
    }

    #[tokio::test]
    async fn no_match_is_never_added() {
        let service = Recording::default().video("B - 2", "V2");
        let report = process(
            &service,
            r#"{"B0": {"playlist_name": "Mix", "songs": [
                {"artist":"A","title":"1"},
                {"artist":"B","title":"2"}
            ]}}"#,
        )
        .await;

        assert_eq!(
            service.calls(),
            vec![create("Mix"), search("A - 1"), search("B - 2"), add("P1", "V2")]
        );
        assert_eq!(report.tracks_not_found, 1);
        assert_eq!(report.tracks_failed, 0);
    }

    #[tokio::test]
    async fn failed_search_is_counted_apart_from_no_match() {
        let service = Recording::default()
            .video("B - 2", "V2")
            .fail_search("A - 1");
        let report = process(
            &service,
            r#"{"B0": {"playlist_name": "Mix", "songs": [
                {"artist":"A","title":"1"},
                {"artist":"B","title":"2"}
            ]}}"#,
        )
        .await;

        assert_eq!(
            service.calls(),
            vec![create("Mix"), search("A - 1"), search("B - 2"), add("P1", "V2")]
        );
        assert_eq!(report.tracks_failed, 1);
        assert_eq!(report.tracks_not_found, 0);
    }

    #[tokio::test]
    async fn failed_create_skips_tracks_but_not_later_blocks() {
        let service = Recording::default()
            .video("A - T", "V1")
            .fail_create("Broken");
        let report = process(
            &service,
            r#"{
                "B0": {"playlist_name": "Broken", "songs": [{"artist":"A","title":"T"}]},
                "B1": {"playlist_name": "Fine", "songs": [{"artist":"A","title":"T"}]}
            }"#,
        )
        .await;

        assert_eq!(
            service.calls(),
            vec![
                create("Broken"),
                create("Fine"),
                search("A - T"),
                add("P1", "V1"),
            ]
        );
        assert_eq!(report.playlists_failed, 1);
        assert_eq!(report.playlists_created, 1);
    }

    #[tokio::test]
    async fn failed_add_does_not_stop_the_playlist() {
        let service = Recording::default()
            .video("A - 1", "V1")
            .video("B - 2", "V2")
            .fail_add("V1");
        let report = process(
            &service,
            r#"{"B0": {"playlist_name": "Mix", "songs": [
                {"artist":"A","title":"1"},
                {"artist":"B","title":"2"}
            ]}}"#,
        )
        .await;

        assert_eq!(
            service.calls(),
            vec![
                create("Mix"),
                search("A - 1"),
                add("P1", "V1"),
                search("B - 2"),
                add("P1", "V2"),
            ]
        );
        assert_eq!(report.tracks_failed, 1);
        assert_eq!(report.tracks_added, 1);
    }

    #[tokio::test]
    async fn blocks_run_in_file_order_with_their_own_playlist() {
        let service = Recording::default()
            .video("A - 1", "V1")
            .video("B - 2", "V2");
        process(
            &service,
            r#"{
                "Z": {"playlist_name": "Second", "songs": [{"artist":"B","title":"2"}]},
                "A": {"playlist_name": "Third", "songs": [{"artist":"A","title":"1"}]}
            }"#,
        )
        .await;

        assert_eq!(
            service.calls(),
            vec![
                create("Second"),
                search("B - 2"),
                add("P1", "V2"),
                create("Third"),
                search("A - 1"),
                add("P2", "V1"),
            ]
        );
    }

    #[tokio::test]
    async fn repeated_queries_are_searched_each_time() {
        let service = Recording::default().video("A - T", "V1");
        process(
            &service,
            r#"{"B0": {"playlist_name": "Twice", "songs": [
                {"artist":"A","title":"T"},
                {"artist":"A","title":"T"}
            ]}}"#,
        )
        .await;

        assert_eq!(
            service.calls(),
            vec![
                create("Twice"),
                search("A - T"),
                add("P1", "V1"),
                search("A - T"),
                add("P1", "V1"),
            ]
        );
    }

    #[tokio::test]
    async fn malformed_input_makes_no_calls() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"{\"B0\": {\"playlist_name\": \"Test\", \"songs\": [")
            .unwrap();

        let service = Recording::default().video("A - T", "V1");
        let config = Config {
            input_file: file.path().display().to_string(),
            ..Default::default()
        };

        let err = Populator::new(&service, &config).run().await.unwrap_err();
        assert!(matches!(err, Error::InputMalformed { .. }));
        assert!(service.calls().is_empty());
    }

    #[tokio::test]
    async fn missing_input_makes_no_calls() {
        let dir = tempfile::tempdir().unwrap();
        let service = Recording::default();
        let config = Config::default();

        let err = Populator::new(&service, &config)
            .run_file(dir.path().join("playlists.json"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InputNotFound { .. }));
        assert!(service.calls().is_empty());
    }

    #[test]
    fn console_write_failure_is_swallowed() {
        console(Err(std::io::Error::new(
            std::io::ErrorKind::BrokenPipe,
            "stderr closed",
        )));
        console(Ok(()));
    }

    #[tokio::test]
    async fn empty_batch_is_not_an_error() {
        let service = Recording::default();
        let report = process(&service, "{}").await;

        assert_eq!(report, BatchReport::default());
        assert!(service.calls().is_empty());
    }
}

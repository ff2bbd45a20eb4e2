use catalog_model::{
    DirectoryAnalysis, FileRecord, MediaItem, MediaKind, NewMediaItem, StorageRootId,
};
use tracing::{debug, info, warn};

use super::AggregationConfig;
use super::title_parser::{
    ParsedTitle, clean_title, mentions_platform, parse_game_title, parse_movie_title,
    parse_music_album, parse_software_title, parse_tv_show,
};
use crate::database::CatalogRepositories;
use crate::error::Result;

const VIDEO: &[&str] = &["mkv", "mp4", "avi", "mov", "wmv", "flv", "m4v", "ts"];
const AUDIO: &[&str] = &["mp3", "flac", "wav", "aac", "ogg", "m4a", "wma", "ape"];
const DISC_IMAGE: &[&str] = &["iso", "img", "bin", "nrg"];
const EBOOK: &[&str] = &["epub", "mobi", "azw3", "pdf", "djvu"];
const COMIC: &[&str] = &["cbr", "cbz", "cb7"];
const INSTALLER: &[&str] = &["exe", "msi", "dmg", "deb", "rpm", "appimage"];

/// Counts from one aggregation pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AggregationSummary {
    /// Top-level directories with files that were analysed.
    pub directories: usize,
    pub created: usize,
    pub updated: usize,
    /// Directories no rule could classify.
    pub skipped: usize,
    pub failed: usize,
}

enum DirectoryOutcome {
    Created,
    Updated,
    Skipped,
}

/// Which extension families a directory's files cover.
#[derive(Debug, Default)]
struct ContentProfile {
    video: bool,
    audio: bool,
    disc_image: bool,
    ebook: bool,
    comic: bool,
    installer: bool,
}

impl ContentProfile {
    fn of<'a>(extensions: impl IntoIterator<Item = &'a str>) -> Self {
        let mut profile = Self::default();
        for ext in extensions {
            let ext = ext.trim_start_matches('.').to_ascii_lowercase();
            let ext = ext.as_str();
            profile.video |= VIDEO.contains(&ext);
            profile.audio |= AUDIO.contains(&ext);
            profile.disc_image |= DISC_IMAGE.contains(&ext);
            profile.ebook |= EBOOK.contains(&ext);
            profile.comic |= COMIC.contains(&ext);
            profile.installer |= INSTALLER.contains(&ext);
        }
        profile
    }
}

/// Classify a directory from its name and the extensions of its files.
///
/// Rules apply in order: TV naming, comics, e-books without video or audio,
/// audio without video, installers or disc images (software), disc images
/// named for a platform (games), video (movies), and finally a bare movie
/// title that carries a year.
pub fn detect_media_kind<'a>(
    name: &str,
    extensions: impl IntoIterator<Item = &'a str>,
) -> Option<(MediaKind, ParsedTitle)> {
    let profile = ContentProfile::of(extensions);

    let tv = parse_tv_show(name);
    if tv.season.is_some() || tv.episode.is_some() {
        return Some((MediaKind::TvShow, tv));
    }
    let lowered = name.to_lowercase();
    if ["season", "complete", "s01", "s02"]
        .iter()
        .any(|marker| lowered.contains(marker))
    {
        return Some((MediaKind::TvShow, tv));
    }

    let plain = || ParsedTitle {
        title: clean_title(name),
        ..ParsedTitle::default()
    };

    if profile.comic {
        return Some((MediaKind::Comic, plain()));
    }
    if profile.ebook && !profile.video && !profile.audio {
        return Some((MediaKind::Book, plain()));
    }
    if profile.audio && !profile.video {
        return Some((MediaKind::MusicAlbum, parse_music_album(name)));
    }
    if profile.installer || profile.disc_image {
        return Some((MediaKind::Software, parse_software_title(name)));
    }
    // Shadowed by the software rule for every disc image.
    if profile.disc_image && mentions_platform(name) {
        return Some((MediaKind::Game, parse_game_title(name)));
    }
    if profile.video {
        return Some((MediaKind::Movie, parse_movie_title(name)));
    }

    let parsed = parse_movie_title(name);
    parsed.year.is_some().then_some((MediaKind::Movie, parsed))
}

/// 0.5 base, +0.3 for a year, +0.4 for quality hints, capped at 0.9.
fn confidence(parsed: &ParsedTitle) -> f64 {
    let mut score = 0.5;
    if parsed.year.is_some() {
        score += 0.3;
    }
    if !parsed.quality_hints.is_empty() {
        score += 0.4;
    }
    f64::min(score, 0.9)
}

/// Turns a root's top-level directories into media entities after a scan.
#[derive(Debug, Clone)]
pub struct AggregationService {
    repositories: CatalogRepositories,
    config: AggregationConfig,
}

impl AggregationService {
    pub fn new(repositories: CatalogRepositories, config: AggregationConfig) -> Self {
        Self {
            repositories,
            config,
        }
    }

    /// Classify every top-level directory of `storage_root_id`.
    ///
    /// A failure inside one directory is logged and counted; the pass
    /// continues with the next directory.
    pub async fn aggregate_after_scan(
        &self,
        storage_root_id: StorageRootId,
    ) -> Result<AggregationSummary> {
        let directories = self
            .repositories
            .files
            .top_level_directories(storage_root_id)
            .await?;
        info!(
            storage_root_id = %storage_root_id,
            directories = directories.len(),
            "starting post-scan aggregation"
        );

        let mut summary = AggregationSummary::default();
        for directory in directories {
            let files = match self.repositories.files.child_files(directory.id).await {
                Ok(files) => files,
                Err(err) => {
                    warn!(path = %directory.path, error = %err, "failed to list directory files");
                    summary.failed += 1;
                    continue;
                }
            };
            if files.is_empty() || files.len() < self.config.min_files {
                continue;
            }

            summary.directories += 1;
            match self.process_directory(&directory, &files).await {
                Ok(DirectoryOutcome::Created) => summary.created += 1,
                Ok(DirectoryOutcome::Updated) => summary.updated += 1,
                Ok(DirectoryOutcome::Skipped) => summary.skipped += 1,
                Err(err) => {
                    warn!(path = %directory.path, error = %err, "failed to aggregate directory");
                    summary.failed += 1;
                }
            }
        }

        info!(
            storage_root_id = %storage_root_id,
            created = summary.created,
            updated = summary.updated,
            skipped = summary.skipped,
            failed = summary.failed,
            "post-scan aggregation completed"
        );
        Ok(summary)
    }

    async fn process_directory(
        &self,
        directory: &FileRecord,
        files: &[FileRecord],
    ) -> Result<DirectoryOutcome> {
        let extensions = files.iter().filter_map(|file| file.extension.as_deref());
        let Some((kind, parsed)) = detect_media_kind(&directory.name, extensions) else {
            debug!(path = %directory.path, "directory not classified");
            return Ok(DirectoryOutcome::Skipped);
        };
        if parsed.title.is_empty() {
            debug!(path = %directory.path, "classified directory has no usable title");
            return Ok(DirectoryOutcome::Skipped);
        }

        let media_items = &self.repositories.media_items;
        let type_id = media_items.get_media_type_by_name(kind.as_str()).await?;

        let (item, outcome) = match media_items.get_by_title(&parsed.title, type_id).await? {
            Some(mut existing) => {
                if existing.year.is_none() && parsed.year.is_some() {
                    existing.year = parsed.year;
                    media_items.update(&existing).await?;
                }
                (existing, DirectoryOutcome::Updated)
            }
            None => {
                let mut new_item = NewMediaItem::detected(type_id, parsed.title.clone());
                new_item.year = parsed.year;
                (media_items.create(&new_item).await?, DirectoryOutcome::Created)
            }
        };

        if self.config.link_files {
            self.link_files(&item, files).await;
        }
        self.record_analysis(directory, files, &item, &parsed).await?;

        if kind == MediaKind::TvShow {
            self.build_tv_hierarchy(&item, &parsed).await?;
        }

        debug!(
            path = %directory.path,
            kind = %kind,
            title = %item.title,
            "directory aggregated"
        );
        Ok(outcome)
    }

    async fn link_files(&self, item: &MediaItem, files: &[FileRecord]) {
        for (index, file) in files.iter().enumerate() {
            if let Err(err) = self
                .repositories
                .file_links
                .link_file_to_item(item.id, file.id, index == 0)
                .await
            {
                warn!(
                    file_id = %file.id,
                    media_item_id = %item.id,
                    error = %err,
                    "failed to link file to media item"
                );
            }
        }
    }

    async fn record_analysis(
        &self,
        directory: &FileRecord,
        files: &[FileRecord],
        item: &MediaItem,
        parsed: &ParsedTitle,
    ) -> Result<()> {
        let analyses = &self.repositories.directory_analyses;
        let mut analysis = DirectoryAnalysis {
            id: 0,
            directory_path: directory.path.clone(),
            media_item_id: Some(item.id),
            confidence_score: confidence(parsed),
            detection_method: self.config.detection_method.clone(),
            files_count: i32::try_from(files.len()).unwrap_or(i32::MAX),
            total_size: files.iter().map(|file| file.size).sum(),
        };

        match analyses.get_by_path(&directory.path).await? {
            Some(existing) => {
                analysis.id = existing.id;
                analyses.update(&analysis).await
            }
            None => analyses.create(&analysis).await.map(|_| ()),
        }
    }

    /// Season under the show, episode under the season; existing children
    /// with the same title are reused.
    async fn build_tv_hierarchy(&self, show: &MediaItem, parsed: &ParsedTitle) -> Result<()> {
        let Some(season) = parsed.season else {
            return Ok(());
        };
        let media_items = &self.repositories.media_items;

        let season_type = media_items
            .get_media_type_by_name(MediaKind::TvSeason.as_str())
            .await?;
        let season_title = format!("Season {season}");
        let season_item = match media_items
            .get_child_by_title(show.id, &season_title, season_type)
            .await?
        {
            Some(existing) => existing,
            None => {
                let mut new_season = NewMediaItem::detected(season_type, season_title);
                new_season.parent_id = Some(show.id);
                new_season.season_number = Some(season);
                media_items.create(&new_season).await?
            }
        };

        let Some(episode) = parsed.episode else {
            return Ok(());
        };
        let episode_type = media_items
            .get_media_type_by_name(MediaKind::TvEpisode.as_str())
            .await?;
        let episode_title = format!("Episode {episode}");
        if media_items
            .get_child_by_title(season_item.id, &episode_title, episode_type)
            .await?
            .is_none()
        {
            let mut new_episode = NewMediaItem::detected(episode_type, episode_title);
            new_episode.parent_id = Some(season_item.id);
            new_episode.season_number = Some(season);
            new_episode.episode_number = Some(episode);
            media_items.create(&new_episode).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kind_of(name: &str, extensions: &[&str]) -> Option<MediaKind> {
        detect_media_kind(name, extensions.iter().copied()).map(|(kind, _)| kind)
    }

    #[test]
    fn tv_naming_wins_over_content() {
        assert_eq!(kind_of("Breaking.Bad.S01E02", &["mkv"]), Some(MediaKind::TvShow));
        assert_eq!(kind_of("Firefly Complete", &["mp3"]), Some(MediaKind::TvShow));
    }

    #[test]
    fn content_rules_in_priority_order() {
        assert_eq!(kind_of("Saga Vol 1", &["cbz", "mkv"]), Some(MediaKind::Comic));
        assert_eq!(kind_of("Dune", &["epub", "pdf"]), Some(MediaKind::Book));
        assert_eq!(
            kind_of("Pink Floyd - The Wall (1979)", &["flac"]),
            Some(MediaKind::MusicAlbum)
        );
        assert_eq!(kind_of("Halo 3 (Xbox 360)", &["iso"]), Some(MediaKind::Software));
        assert_eq!(kind_of("Ubuntu 24.04", &["iso"]), Some(MediaKind::Software));
        assert_eq!(kind_of("VLC 3.0.20", &["exe"]), Some(MediaKind::Software));
        assert_eq!(kind_of("Heat (1995)", &["mkv", "srt"]), Some(MediaKind::Movie));
    }

    #[test]
    fn unclassifiable_without_year() {
        assert_eq!(kind_of("Heat (1995)", &["nfo"]), Some(MediaKind::Movie));
        assert_eq!(kind_of("Taxes", &["xlsx"]), None);
    }

    #[test]
    fn confidence_is_capped() {
        let mut parsed = ParsedTitle::default();
        assert_eq!(confidence(&parsed), 0.5);
        parsed.year = Some(1999);
        assert!((confidence(&parsed) - 0.8).abs() < 1e-9);
        parsed.quality_hints = vec!["1080p"];
        assert_eq!(confidence(&parsed), 0.9);
    }
}

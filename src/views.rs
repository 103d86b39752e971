//! View models served to the dashboard front end, and the deterministic
//! projections from upstream records into them.

use serde::Serialize;

use crate::models::{
    Artist, CurrentlyPlaying, Paging, Playlist, PlaylistDetail, SimpleArtist, Track, UserProfile,
    first_image,
};

pub const PROFILE_PLACEHOLDER: &str = "/placeholder.png?height=42&width=42";
pub const ITEM_PLACEHOLDER: &str = "/placeholder.png?height=28&width=28";

/// Top artists, top tracks and genres shown on the dashboard.
pub const TOP_ITEMS: usize = 6;

const NOT_AVAILABLE: &str = "N/A";
const AVERAGE_TRACK_MINUTES: f64 = 3.5;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardView {
    pub profile: ProfileView,
    pub library: LibraryView,
    pub music_taste: MusicTasteView,
    pub activity: ActivityView,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileView {
    pub display_name: Option<String>,
    pub image_url: String,
    pub followers: String,
    pub id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LibraryView {
    pub total_followed_artists: String,
    pub total_saved_tracks: String,
    pub total_saved_albums: String,
    pub total_playlists: String,
    pub estimated_listening_hours: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MusicTasteView {
    pub top_genres: Vec<GenreView>,
    pub top_artists: Vec<ArtistView>,
    pub top_tracks: Vec<TrackView>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GenreView {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtistView {
    pub name: String,
    pub image: String,
    pub spotify_url: Option<String>,
    pub popularity: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackView {
    pub name: String,
    pub artist: String,
    pub image: String,
    pub spotify_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityView {
    pub currently_playing: Option<NowPlayingView>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NowPlayingView {
    pub name: String,
    pub artist: String,
    pub id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlaylistsView {
    pub playlists: Vec<PlaylistSummaryView>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaylistSummaryView {
    pub id: String,
    pub name: String,
    pub tracks: u64,
    pub description: Option<String>,
    pub owner: Option<String>,
    pub spotify_url: Option<String>,
    pub cover: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaylistDetailView {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub total_tracks: u64,
    pub total_duration: String,
    pub owner: Option<String>,
    pub spotify_url: Option<String>,
    pub cover: String,
    pub songs: Vec<SongView>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SongView {
    pub name: String,
    pub artist: String,
}

/// Formats milliseconds as `<minutes>m <seconds>s`, flooring both parts.
#[must_use]
pub fn format_duration(ms: u64) -> String {
    let minutes = ms / 60_000;
    let seconds = (ms % 60_000) / 1_000;
    format!("{minutes}m {seconds}s")
}

/// Formats a count with `,` thousands separators (`1234567` → `1,234,567`).
#[must_use]
pub fn format_count(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

fn format_optional_count(n: Option<u64>) -> String {
    n.map_or_else(|| NOT_AVAILABLE.to_string(), format_count)
}

/// Genres across `artists` in first-seen order, without repeats, at most `limit`.
#[must_use]
pub fn dedupe_genres(artists: &[Artist], limit: usize) -> Vec<String> {
    let mut genres: Vec<String> = Vec::new();
    for genre in artists.iter().flat_map(|a| a.genres.iter()) {
        if genres.len() == limit {
            break;
        }
        if !genres.contains(genre) {
            genres.push(genre.clone());
        }
    }
    genres
}

/// Rough listening time: saved tracks at 3.5 minutes each, rounded to hours.
#[must_use]
pub fn estimated_listening_hours(saved_tracks: u64) -> u64 {
    // Saved-track totals are far below f64's exact integer range.
    #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let hours = (saved_tracks as f64 * AVERAGE_TRACK_MINUTES / 60.0).round() as u64;
    hours
}

fn join_artists(artists: &[SimpleArtist]) -> String {
    artists
        .iter()
        .map(|a| a.name.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

fn image_or(images: Option<&Vec<crate::models::Image>>, placeholder: &str) -> String {
    first_image(images).unwrap_or(placeholder).to_string()
}

/// Upstream records gathered by one dashboard load.
#[derive(Debug, Clone)]
pub struct DashboardSources {
    pub profile: UserProfile,
    pub top_artists: Paging<Artist>,
    pub top_tracks: Paging<Track>,
    pub currently_playing: Option<CurrentlyPlaying>,
    pub playlists_total: Option<u64>,
    pub saved_tracks_total: Option<u64>,
    pub saved_albums_total: Option<u64>,
}

#[must_use]
pub fn project_dashboard(sources: DashboardSources) -> DashboardView {
    let DashboardSources {
        profile,
        top_artists,
        top_tracks,
        currently_playing,
        playlists_total,
        saved_tracks_total,
        saved_albums_total,
    } = sources;

    let profile_view = ProfileView {
        display_name: profile.display_name,
        image_url: image_or(profile.images.as_ref(), PROFILE_PLACEHOLDER),
        followers: format_optional_count(profile.followers.and_then(|f| f.total)),
        id: profile.id,
    };

    let library = LibraryView {
        total_followed_artists: format_optional_count(top_artists.total),
        total_saved_tracks: format_optional_count(saved_tracks_total),
        total_saved_albums: format_optional_count(saved_albums_total),
        total_playlists: format_optional_count(playlists_total),
        estimated_listening_hours: format_count(estimated_listening_hours(
            saved_tracks_total.unwrap_or(0),
        )),
    };

    let top_genres = dedupe_genres(&top_artists.items, TOP_ITEMS)
        .into_iter()
        .map(|name| GenreView { name })
        .collect();

    let artists = top_artists
        .items
        .into_iter()
        .take(TOP_ITEMS)
        .map(|artist| ArtistView {
            image: image_or(artist.images.as_ref(), ITEM_PLACEHOLDER),
            name: artist.name,
            spotify_url: artist.external_urls.spotify,
            popularity: artist.popularity,
        })
        .collect();

    let tracks = top_tracks
        .items
        .into_iter()
        .take(TOP_ITEMS)
        .map(|track| TrackView {
            artist: join_artists(&track.artists),
            image: image_or(
                track.album.as_ref().and_then(|a| a.images.as_ref()),
                ITEM_PLACEHOLDER,
            ),
            name: track.name,
            spotify_url: track.external_urls.spotify,
        })
        .collect();

    let now_playing = currently_playing
        .filter(|c| c.is_playing)
        .and_then(|c| c.item)
        .map(|item| NowPlayingView {
            artist: join_artists(&item.artists),
            name: item.name,
            id: item.id,
        });

    DashboardView {
        profile: profile_view,
        library,
        music_taste: MusicTasteView {
            top_genres,
            top_artists: artists,
            top_tracks: tracks,
        },
        activity: ActivityView {
            currently_playing: now_playing,
        },
    }
}

#[must_use]
pub fn project_playlists(page: Paging<Playlist>) -> PlaylistsView {
    let playlists = page
        .items
        .into_iter()
        .map(|p| PlaylistSummaryView {
            cover: image_or(p.images.as_ref(), ITEM_PLACEHOLDER),
            id: p.id,
            name: p.name,
            tracks: p.tracks.total.unwrap_or(0),
            description: p.description,
            owner: p.owner.display_name,
            spotify_url: p.external_urls.spotify,
        })
        .collect();
    PlaylistsView { playlists }
}

#[must_use]
pub fn project_playlist_detail(detail: PlaylistDetail) -> PlaylistDetailView {
    let tracks: Vec<Track> = detail
        .tracks
        .items
        .into_iter()
        .filter_map(|item| item.track)
        .collect();
    let total_ms: u64 = tracks.iter().filter_map(|t| t.duration_ms).sum();
    let songs = tracks
        .iter()
        .map(|t| SongView {
            name: t.name.clone(),
            artist: join_artists(&t.artists),
        })
        .collect();

    PlaylistDetailView {
        cover: image_or(detail.images.as_ref(), ITEM_PLACEHOLDER),
        id: detail.id,
        name: detail.name,
        description: detail.description,
        total_tracks: detail.tracks.total.unwrap_or(0),
        total_duration: format_duration(total_ms),
        owner: detail.owner.display_name,
        spotify_url: detail.external_urls.spotify,
        songs,
    }
}

use crate::api::ApiClient;
use crate::error::Error;
use crate::models::{
    Artist, CurrentlyPlaying, Paging, Playlist, PlaylistDetail, Track, UserProfile,
};
use crate::session::{CredentialStore, Session};
use crate::types::PlaylistId;
use crate::views::{
    DashboardSources, DashboardView, PlaylistDetailView, PlaylistsView, project_dashboard,
    project_playlist_detail, project_playlists,
};

/// Page size for the playlist listing.
pub const PLAYLIST_PAGE_SIZE: u32 = 50;

/// Load everything the dashboard shows, in one concurrent batch.
///
/// The seven upstream calls are independent; the first failure aborts the
/// whole projection.
///
/// # Errors
///
/// Any error from [`ApiClient::request`] or decoding.
pub async fn load_dashboard<S: CredentialStore>(
    api: &ApiClient,
    session: &Session<S>,
) -> Result<DashboardView, Error> {
    let (
        profile,
        top_artists,
        top_tracks,
        currently_playing,
        playlists,
        saved_tracks,
        saved_albums,
    ) = tokio::try_join!(
        api.get_json::<UserProfile, S>(session, "/me"),
        api.get_json::<Paging<Artist>, S>(session, "/me/top/artists?limit=6"),
        api.get_json::<Paging<Track>, S>(session, "/me/top/tracks?limit=6"),
        api.get_optional_json::<CurrentlyPlaying, S>(session, "/me/player/currently-playing"),
        api.get_json::<Paging<serde_json::Value>, S>(session, "/me/playlists?limit=1"),
        api.get_json::<Paging<serde_json::Value>, S>(session, "/me/tracks?limit=1"),
        api.get_json::<Paging<serde_json::Value>, S>(session, "/me/albums?limit=1"),
    )?;

    Ok(project_dashboard(DashboardSources {
        profile,
        top_artists,
        top_tracks,
        currently_playing,
        playlists_total: playlists.total,
        saved_tracks_total: saved_tracks.total,
        saved_albums_total: saved_albums.total,
    }))
}

/// The user's playlists, first page of [`PLAYLIST_PAGE_SIZE`].
///
/// # Errors
///
/// Any error from [`ApiClient::request`] or decoding.
pub async fn load_playlists<S: CredentialStore>(
    api: &ApiClient,
    session: &Session<S>,
) -> Result<PlaylistsView, Error> {
    let path = format!("/me/playlists?limit={PLAYLIST_PAGE_SIZE}");
    let page: Paging<Playlist> = api.get_json_at(session, &path, "/me/playlists").await?;
    Ok(project_playlists(page))
}

/// One playlist (owned or public) with its songs and total duration.
///
/// # Errors
///
/// Any error from [`ApiClient::request`] or decoding.
pub async fn load_playlist<S: CredentialStore>(
    api: &ApiClient,
    session: &Session<S>,
    id: &PlaylistId,
) -> Result<PlaylistDetailView, Error> {
    let path = format!("/playlists/{}", id.path_segment());
    let detail: PlaylistDetail = api.get_json_at(session, &path, "/playlists/{id}").await?;
    Ok(project_playlist_detail(detail))
}

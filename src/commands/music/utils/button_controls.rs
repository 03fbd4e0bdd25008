use serenity::all::{
    ButtonStyle, CreateActionRow, CreateButton, CreateSelectMenu, CreateSelectMenuKind,
    CreateSelectMenuOption, ReactionType,
};

use crate::commands::music::audio_sources::spotify::SpotifyPlaylist;

use super::embedded_messages::truncate;

/// Custom ids of the Now Playing buttons all start with this.
pub const CONTROL_PREFIX: &str = "music_";
/// Custom id of the `/tneu` playlist menu
pub const PLAYLIST_MENU_ID: &str = "tneu_playlist";
/// Discord allows this many options in one select menu
const MENU_OPTION_LIMIT: usize = 25;
/// Discord's limit on option labels and descriptions
const MENU_TEXT_LIMIT: usize = 100;

/// What a Now Playing button asks the player to do
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlAction {
    TogglePause,
    Skip,
    Stop,
    Refresh,
}

impl ControlAction {
    pub fn custom_id(self) -> &'static str {
        match self {
            ControlAction::TogglePause => "music_pause_resume",
            ControlAction::Skip => "music_skip",
            ControlAction::Stop => "music_stop",
            ControlAction::Refresh => "music_refresh",
        }
    }

    pub fn from_custom_id(custom_id: &str) -> Option<Self> {
        match custom_id {
            "music_pause_resume" => Some(ControlAction::TogglePause),
            "music_skip" => Some(ControlAction::Skip),
            "music_stop" => Some(ControlAction::Stop),
            "music_refresh" => Some(ControlAction::Refresh),
            _ => None,
        }
    }
}

/// Creates the row of music control buttons. A paused track gets a Resume
/// button in place of Pause.
pub fn create_music_control_buttons(paused: bool) -> Vec<CreateActionRow> {
    let pause_resume = if paused {
        CreateButton::new(ControlAction::TogglePause.custom_id())
            .emoji(ReactionType::Unicode("▶️".to_string()))
            .style(ButtonStyle::Success)
            .label("Resume")
    } else {
        CreateButton::new(ControlAction::TogglePause.custom_id())
            .emoji(ReactionType::Unicode("⏸️".to_string()))
            .style(ButtonStyle::Secondary)
            .label("Pause")
    };

    let skip = CreateButton::new(ControlAction::Skip.custom_id())
        .emoji(ReactionType::Unicode("⏭️".to_string()))
        .style(ButtonStyle::Secondary)
        .label("Skip");

    let stop = CreateButton::new(ControlAction::Stop.custom_id())
        .emoji(ReactionType::Unicode("⏹️".to_string()))
        .style(ButtonStyle::Danger)
        .label("Stop");

    let refresh = CreateButton::new(ControlAction::Refresh.custom_id())
        .emoji(ReactionType::Unicode("🔄".to_string()))
        .style(ButtonStyle::Primary)
        .label("Refresh");

    vec![CreateActionRow::Buttons(vec![pause_resume, skip, stop, refresh])]
}

/// Select menu offering the first 25 playlists. Option values are playlist ids.
pub fn create_playlist_menu(playlists: &[SpotifyPlaylist]) -> Vec<CreateActionRow> {
    let options: Vec<CreateSelectMenuOption> = playlists
        .iter()
        .take(MENU_OPTION_LIMIT)
        .map(|playlist| {
            CreateSelectMenuOption::new(
                truncate(&playlist.name, MENU_TEXT_LIMIT),
                playlist.id.clone(),
            )
            .description(truncate(
                &format!("{} tracks • {}", playlist.track_count, playlist.owner),
                MENU_TEXT_LIMIT,
            ))
        })
        .collect();

    let menu = CreateSelectMenu::new(PLAYLIST_MENU_ID, CreateSelectMenuKind::String { options })
        .placeholder("Choose a playlist to play...");

    vec![CreateActionRow::SelectMenu(menu)]
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(ControlAction::TogglePause)]
    #[test_case(ControlAction::Skip)]
    #[test_case(ControlAction::Stop)]
    #[test_case(ControlAction::Refresh)]
    fn test_custom_id_routes_back(action: ControlAction) {
        let custom_id = action.custom_id();

        assert!(custom_id.starts_with(CONTROL_PREFIX));
        assert_eq!(ControlAction::from_custom_id(custom_id), Some(action));
    }

    #[test_case("music_play_pause" ; "retired id")]
    #[test_case("tneu_playlist" ; "playlist menu")]
    #[test_case("" ; "empty")]
    fn test_unknown_custom_id(custom_id: &str) {
        assert_eq!(ControlAction::from_custom_id(custom_id), None);
    }

    #[test_case(false => "Pause"; "playing")]
    #[test_case(true => "Resume"; "paused")]
    fn test_pause_button_label(paused: bool) -> String {
        let rows = serde_json::to_value(create_music_control_buttons(paused)).unwrap();

        let buttons = rows[0]["components"].as_array().unwrap();
        assert_eq!(buttons.len(), 4);
        assert_eq!(buttons[0]["custom_id"], "music_pause_resume");
        buttons[0]["label"].as_str().unwrap().to_string()
    }

    fn playlist(index: usize, name: &str) -> SpotifyPlaylist {
        SpotifyPlaylist {
            id: format!("pl{}", index),
            name: name.to_string(),
            track_count: 12,
            public: true,
            owner: "TNEU".to_string(),
            url: format!("https://open.spotify.com/playlist/pl{}", index),
        }
    }

    #[test]
    fn test_playlist_menu_respects_discord_limits() {
        let long_name = "x".repeat(150);
        let playlists: Vec<SpotifyPlaylist> = (0..30).map(|i| playlist(i, &long_name)).collect();

        let rows = serde_json::to_value(create_playlist_menu(&playlists)).unwrap();

        let menu = &rows[0]["components"][0];
        assert_eq!(menu["custom_id"], PLAYLIST_MENU_ID);
        let options = menu["options"].as_array().unwrap();
        assert_eq!(options.len(), 25);
        assert_eq!(options[0]["value"], "pl0");
        assert_eq!(options[0]["label"].as_str().unwrap().chars().count(), 100);
        assert_eq!(options[0]["description"], "12 tracks • TNEU");
    }
}

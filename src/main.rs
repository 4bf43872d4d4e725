#![warn(missing_docs)]
//! Multi-level hex world viewer.
//!
//! Shows one level of a nested hex map at a time. Click a tile to focus it,
//! `Enter` to descend into it, `Backspace` to climb back out. Drag to pan,
//! scroll to zoom, `Tab` for the inspector, `Escape` to quit.

mod avatar;
mod camera;
pub mod math;
mod models;
mod navigation;
mod scene;
mod tiles;

use std::sync::Arc;

use bevy::app::AppExit;
use bevy::prelude::*;
#[cfg(feature = "native")]
use bevy::remote::{RemotePlugin, http::RemoteHttpPlugin};
use bevy_inspector_egui::quick::WorldInspectorPlugin;

use navigation::NavigationConfig;
use scene::{SceneConfig, TileProvider};
use tiles::ProceduralSource;

/// Application-wide game state, used for system scheduling.
#[derive(States, Default, Debug, Clone, PartialEq, Eq, Hash, Reflect)]
pub enum GameState {
    /// Normal viewing.
    #[default]
    Running,
    /// Debug overlay active (Tab to toggle).
    Debugging,
}

/// Frame phases of `Update`, in order.
///
/// Effects written in `Navigate` are consumed in `Execute` the same frame;
/// signals written in `Animate` reach the navigator next frame.
#[derive(SystemSet, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AppSet {
    /// Raw input becomes requests and picks.
    Input,
    /// The navigator validates requests and advances transitions.
    Navigate,
    /// Subsystems start the work the navigator asked for.
    Execute,
    /// Tweens, fades and fetches progress and report completion.
    Animate,
}

#[cfg(feature = "native")]
#[derive(clap::Parser, Debug)]
#[command(name = "hex-strata", about = "Multi-level hex world viewer")]
struct Cli {
    /// Level to start on.
    #[arg(long)]
    level: Option<i32>,
    /// Rings of tiles around each level's origin.
    #[arg(long)]
    radius: Option<u32>,
    /// Seed for procedural levels.
    #[arg(long)]
    seed: Option<u32>,
    /// Read levels from JSON files in this directory instead of generating them.
    #[arg(long)]
    tiles_dir: Option<std::path::PathBuf>,
}

struct Settings {
    scene: SceneConfig,
    navigation: NavigationConfig,
    provider: TileProvider,
}

impl Settings {
    #[cfg(feature = "native")]
    fn from_args() -> Self {
        use clap::Parser;

        let cli = Cli::parse();
        let mut scene = SceneConfig::default();
        let mut navigation = NavigationConfig::default();
        if let Some(level) = cli.level {
            navigation.start_level = level;
        }
        if let Some(radius) = cli.radius {
            scene.grid_radius = radius;
        }
        let provider = match cli.tiles_dir {
            Some(dir) => TileProvider(Arc::new(tiles::source::DirectorySource::new(dir))),
            None => TileProvider(Arc::new(ProceduralSource {
                seed: cli.seed.unwrap_or(ProceduralSource::default().seed),
                ..default()
            })),
        };
        Self {
            scene,
            navigation,
            provider,
        }
    }

    #[cfg(not(feature = "native"))]
    fn from_args() -> Self {
        Self {
            scene: SceneConfig::default(),
            navigation: NavigationConfig::default(),
            provider: TileProvider(Arc::new(ProceduralSource::default())),
        }
    }
}

fn main() {
    let settings = Settings::from_args();
    let mut app = App::new();

    app.add_plugins(DefaultPlugins.set(WindowPlugin {
        primary_window: Some(Window {
            title: "Hex Strata".into(),
            ..default()
        }),
        ..default()
    }))
    .register_type::<GameState>()
    .init_state::<GameState>()
    .configure_sets(
        Update,
        (
            AppSet::Input,
            AppSet::Navigate,
            AppSet::Execute,
            AppSet::Animate,
        )
            .chain(),
    )
    .insert_resource(settings.provider);

    #[cfg(feature = "native")]
    app.add_plugins(RemotePlugin::default())
        .add_plugins(RemoteHttpPlugin::default());

    app.add_plugins(bevy_egui::EguiPlugin::default())
        .add_plugins(scene::ScenePlugin(settings.scene))
        .add_plugins(models::ModelsPlugin(models::ModelsConfig::default()))
        .add_plugins(tiles::TilesPlugin(tiles::TilesConfig::default()))
        .add_plugins(navigation::NavigationPlugin(settings.navigation))
        .add_plugins(camera::CameraPlugin(camera::CameraConfig::default()))
        .add_plugins(avatar::AvatarPlugin(avatar::AvatarConfig::default()))
        .add_systems(Update, exit_on_esc)
        .add_systems(Update, toggle_inspector)
        .add_plugins(WorldInspectorPlugin::new().run_if(in_state(GameState::Debugging)));

    app.run();
}

fn toggle_inspector(
    keys: Res<ButtonInput<KeyCode>>,
    state: Res<State<GameState>>,
    mut next: ResMut<NextState<GameState>>,
) {
    if keys.just_pressed(KeyCode::Tab) {
        next.set(match state.get() {
            GameState::Running => GameState::Debugging,
            GameState::Debugging => GameState::Running,
        });
    }
}

fn exit_on_esc(keys: Res<ButtonInput<KeyCode>>, mut exit: MessageWriter<AppExit>) {
    if keys.just_pressed(KeyCode::Escape) {
        exit.write(AppExit::Success);
    }
}

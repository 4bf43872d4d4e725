//! Level navigation: descend into a tile, ascend back out.
//!
//! [`navigator::LevelNavigator`] holds the level, the lineage of parent tiles
//! and the transition phase. Systems here turn key presses into requests,
//! feed completion signals back and run the overlay fade.

mod entities;
pub mod navigator;
pub mod systems;

pub use entities::{NavigationRequest, Navigator};
pub use navigator::{NavEffect, NavSignal};

use bevy::prelude::*;

use crate::AppSet;

/// Level range and transition timing.
#[derive(Resource, Clone, Debug, Reflect)]
pub struct NavigationConfig {
    /// Innermost level.
    pub min_level: i32,
    /// Outermost level.
    pub max_level: i32,
    pub start_level: i32,
    pub fade_in_secs: f32,
    pub fade_out_secs: f32,
    /// Overlay alpha at the peak of a transition.
    pub overlay_opacity: f32,
    /// Overlay colour for ascends (descends use the entered tile's colour).
    pub ascend_tint: Color,
    /// Distance of the overlay quad in front of the camera.
    pub overlay_distance: f32,
    /// Side length of the overlay quad; must cover the view at that distance.
    pub overlay_extent: f32,
}

impl Default for NavigationConfig {
    fn default() -> Self {
        Self {
            min_level: 0,
            max_level: 3,
            start_level: 2,
            fade_in_secs: 0.5,
            fade_out_secs: 0.7,
            overlay_opacity: 1.0,
            ascend_tint: Color::srgb(0.02, 0.02, 0.05),
            overlay_distance: 0.5,
            overlay_extent: 4.0,
        }
    }
}

/// Navigator resource, input handling and the transition overlay.
pub struct NavigationPlugin(pub NavigationConfig);

impl Plugin for NavigationPlugin {
    fn build(&self, app: &mut App) {
        let cfg = &self.0;
        app.register_type::<NavigationConfig>()
            .insert_resource(cfg.clone())
            .insert_resource(Navigator(navigator::LevelNavigator::new(
                cfg.min_level,
                cfg.max_level,
                cfg.start_level,
            )))
            .add_message::<NavigationRequest>()
            .add_message::<NavEffect>()
            .add_message::<NavSignal>()
            .add_systems(PostStartup, systems::spawn_fade_overlay)
            .add_systems(
                Update,
                (
                    systems::read_navigation_keys.in_set(AppSet::Input),
                    (
                        systems::handle_navigation_requests,
                        systems::advance_navigation,
                    )
                        .chain()
                        .in_set(AppSet::Navigate),
                    systems::run_overlay_fades.in_set(AppSet::Execute),
                ),
            );
    }
}

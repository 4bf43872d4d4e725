//! Level navigation state machine.
//!
//! The navigator never touches the world. A request returns the first batch
//! of [`NavEffect`]s; each completed effect is reported back as a
//! [`NavSignal`], which yields the next batch. A transition is a strict
//! sequence of such steps and only one runs at a time.
//!
//! Descend: `Approach` (camera hover ∥ fade-in) → commit → `AwaitTiles` →
//! `FadeOut` → idle.
//! Ascend: `Approach` (fade-in only) → commit → `AwaitTiles` → `FadeOut` →
//! idle.

use bevy::prelude::*;
use hexx::Hex;

/// Which way a transition moves through the level hierarchy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Reflect)]
pub enum Direction {
    /// Into a tile: `level - 1`.
    Descend,
    /// Out to the enclosing map: `level + 1`.
    Ascend,
}

/// The externally visible navigation state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NavigationContext {
    pub level: i32,
    /// Outer-level cell the current level is nested in.
    pub parent: Option<Hex>,
}

/// Progress within one transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Approach { camera_done: bool, fade_done: bool },
    AwaitTiles,
    FadeOut,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Transitioning {
        direction: Direction,
        step: Step,
        /// Descend: the tile being entered. Ascend: the outer cell to refocus on.
        anchor: Hex,
    },
}

/// Work the navigator asks the rest of the app to carry out.
#[derive(Message, Debug, Clone, Copy, PartialEq)]
pub enum NavEffect {
    /// Move the camera to hover over `over` on the current level.
    HoverCamera { over: Hex },
    /// Fade the overlay in, tinted.
    FadeIn { tint: Color },
    /// Dispose every tile of the current level.
    DisposeTiles,
    /// Fetch and build the tiles of `level`.
    FetchTiles { level: i32, parent: Option<Hex> },
    /// Reset the camera to the default framing around `focus`.
    FrameCamera { focus: Hex },
    /// Move the avatar to `at` without animation.
    PlaceAvatar { at: Hex },
    /// Fade the overlay back out.
    FadeOut,
}

/// Completion reports for [`NavEffect`]s.
#[derive(Message, Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavSignal {
    CameraArrived,
    FadeInDone,
    /// The new tile set is in place (possibly empty after a failed fetch).
    TilesSettled,
    FadeOutDone,
}

/// Why a navigation request was ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum NavigationError {
    #[error("a transition is already in progress")]
    Busy,
    #[error("level {0} is the innermost level")]
    AtMinLevel(i32),
    #[error("level {0} is the outermost level")]
    AtMaxLevel(i32),
    #[error("no tile is focused")]
    NoFocus,
}

#[derive(Debug, Clone)]
pub struct LevelNavigator {
    min_level: i32,
    max_level: i32,
    level: i32,
    /// Tiles descended through, outermost first. The last one is the parent
    /// of the current level.
    lineage: Vec<Hex>,
    phase: Phase,
}

impl LevelNavigator {
    /// `start` is clamped into `[min_level, max_level]`.
    pub fn new(min_level: i32, max_level: i32, start: i32) -> Self {
        let max_level = max_level.max(min_level);
        Self {
            min_level,
            max_level,
            level: start.clamp(min_level, max_level),
            lineage: Vec::new(),
            phase: Phase::Idle,
        }
    }

    pub fn context(&self) -> NavigationContext {
        NavigationContext {
            level: self.level,
            parent: self.lineage.last().copied(),
        }
    }

    #[cfg(test)]
    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_idle(&self) -> bool {
        self.phase == Phase::Idle
    }

    #[cfg(test)]
    pub fn direction(&self) -> Option<Direction> {
        match self.phase {
            Phase::Idle => None,
            Phase::Transitioning { direction, .. } => Some(direction),
        }
    }

    pub fn request_descend(
        &mut self,
        focused: Option<Hex>,
        tint: Color,
    ) -> Result<Vec<NavEffect>, NavigationError> {
        if !self.is_idle() {
            return Err(NavigationError::Busy);
        }
        if self.level <= self.min_level {
            return Err(NavigationError::AtMinLevel(self.level));
        }
        let target = focused.ok_or(NavigationError::NoFocus)?;

        self.phase = Phase::Transitioning {
            direction: Direction::Descend,
            step: Step::Approach {
                camera_done: false,
                fade_done: false,
            },
            anchor: target,
        };
        Ok(vec![
            NavEffect::HoverCamera { over: target },
            NavEffect::FadeIn { tint },
        ])
    }

    pub fn request_ascend(&mut self, tint: Color) -> Result<Vec<NavEffect>, NavigationError> {
        if !self.is_idle() {
            return Err(NavigationError::Busy);
        }
        if self.level >= self.max_level {
            return Err(NavigationError::AtMaxLevel(self.level));
        }
        let refocus = self.lineage.last().copied().unwrap_or(Hex::ZERO);

        self.phase = Phase::Transitioning {
            direction: Direction::Ascend,
            step: Step::Approach {
                camera_done: true,
                fade_done: false,
            },
            anchor: refocus,
        };
        Ok(vec![NavEffect::FadeIn { tint }])
    }

    /// Advances the running transition. Signals that do not match the
    /// current step are ignored.
    pub fn signal(&mut self, signal: NavSignal) -> Vec<NavEffect> {
        let Phase::Transitioning {
            direction,
            step,
            anchor,
        } = self.phase
        else {
            return Vec::new();
        };

        match (step, signal) {
            (
                Step::Approach {
                    camera_done,
                    fade_done,
                },
                NavSignal::CameraArrived | NavSignal::FadeInDone,
            ) => {
                let camera_done = camera_done || signal == NavSignal::CameraArrived;
                let fade_done = fade_done || signal == NavSignal::FadeInDone;
                if camera_done && fade_done {
                    self.commit(direction, anchor)
                } else {
                    self.set_step(Step::Approach {
                        camera_done,
                        fade_done,
                    });
                    Vec::new()
                }
            }
            (Step::AwaitTiles, NavSignal::TilesSettled) => {
                self.set_step(Step::FadeOut);
                let focus = match direction {
                    Direction::Descend => Hex::ZERO,
                    Direction::Ascend => anchor,
                };
                vec![
                    NavEffect::FrameCamera { focus },
                    NavEffect::PlaceAvatar { at: focus },
                    NavEffect::FadeOut,
                ]
            }
            (Step::FadeOut, NavSignal::FadeOutDone) => {
                self.phase = Phase::Idle;
                Vec::new()
            }
            _ => Vec::new(),
        }
    }

    fn set_step(&mut self, next: Step) {
        if let Phase::Transitioning { step, .. } = &mut self.phase {
            *step = next;
        }
    }

    /// The only place the level and lineage change.
    fn commit(&mut self, direction: Direction, anchor: Hex) -> Vec<NavEffect> {
        match direction {
            Direction::Descend => {
                self.level = (self.level - 1).max(self.min_level);
                self.lineage.push(anchor);
            }
            Direction::Ascend => {
                self.level = (self.level + 1).min(self.max_level);
                self.lineage.pop();
            }
        }
        self.set_step(Step::AwaitTiles);
        let ctx = self.context();
        vec![
            NavEffect::DisposeTiles,
            NavEffect::FetchTiles {
                level: ctx.level,
                parent: ctx.parent,
            },
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TINT: Color = Color::srgb(0.2, 0.6, 0.3);

    fn finish_descend(nav: &mut LevelNavigator) -> Vec<NavEffect> {
        let mut all = Vec::new();
        all.extend(nav.signal(NavSignal::CameraArrived));
        all.extend(nav.signal(NavSignal::FadeInDone));
        all.extend(nav.signal(NavSignal::TilesSettled));
        all.extend(nav.signal(NavSignal::FadeOutDone));
        all
    }

    fn finish_ascend(nav: &mut LevelNavigator) -> Vec<NavEffect> {
        let mut all = Vec::new();
        all.extend(nav.signal(NavSignal::FadeInDone));
        all.extend(nav.signal(NavSignal::TilesSettled));
        all.extend(nav.signal(NavSignal::FadeOutDone));
        all
    }

    #[test]
    fn start_level_is_clamped() {
        assert_eq!(LevelNavigator::new(0, 2, 7).context().level, 2);
        assert_eq!(LevelNavigator::new(0, 2, -3).context().level, 0);
    }

    #[test]
    fn descend_runs_steps_in_order() {
        let mut nav = LevelNavigator::new(0, 2, 2);
        let target = Hex::new(1, 0);

        let first = nav.request_descend(Some(target), TINT).unwrap();
        assert_eq!(
            first,
            vec![
                NavEffect::HoverCamera { over: target },
                NavEffect::FadeIn { tint: TINT }
            ]
        );
        assert_eq!(nav.direction(), Some(Direction::Descend));

        // Camera alone does not commit.
        assert!(nav.signal(NavSignal::CameraArrived).is_empty());
        assert_eq!(nav.context().level, 2);

        let committed = nav.signal(NavSignal::FadeInDone);
        assert_eq!(
            committed,
            vec![
                NavEffect::DisposeTiles,
                NavEffect::FetchTiles {
                    level: 1,
                    parent: Some(target)
                }
            ]
        );
        assert_eq!(
            nav.context(),
            NavigationContext {
                level: 1,
                parent: Some(target)
            }
        );

        let settled = nav.signal(NavSignal::TilesSettled);
        assert_eq!(
            settled,
            vec![
                NavEffect::FrameCamera { focus: Hex::ZERO },
                NavEffect::PlaceAvatar { at: Hex::ZERO },
                NavEffect::FadeOut
            ]
        );
        assert!(!nav.is_idle());

        assert!(nav.signal(NavSignal::FadeOutDone).is_empty());
        assert!(nav.is_idle());
    }

    #[test]
    fn approach_completion_order_does_not_matter() {
        let mut nav = LevelNavigator::new(0, 2, 2);
        nav.request_descend(Some(Hex::ZERO), TINT).unwrap();
        assert!(nav.signal(NavSignal::FadeInDone).is_empty());
        assert_eq!(nav.signal(NavSignal::CameraArrived).len(), 2);
        assert_eq!(nav.context().level, 1);
    }

    #[test]
    fn second_request_while_transitioning_is_rejected() {
        let mut nav = LevelNavigator::new(0, 2, 2);
        nav.request_descend(Some(Hex::new(1, 0)), TINT).unwrap();
        assert_eq!(
            nav.request_descend(Some(Hex::new(0, 1)), TINT),
            Err(NavigationError::Busy)
        );
        assert_eq!(nav.request_ascend(TINT), Err(NavigationError::Busy));

        finish_descend(&mut nav);
        assert_eq!(nav.context().level, 1);
        assert_eq!(nav.context().parent, Some(Hex::new(1, 0)));
    }

    #[test]
    fn descend_at_min_level_is_rejected() {
        let mut nav = LevelNavigator::new(0, 2, 0);
        assert_eq!(
            nav.request_descend(Some(Hex::ZERO), TINT),
            Err(NavigationError::AtMinLevel(0))
        );
        assert!(nav.is_idle());
        assert_eq!(nav.context().level, 0);
    }

    #[test]
    fn descend_without_focus_is_rejected() {
        let mut nav = LevelNavigator::new(0, 2, 2);
        assert_eq!(
            nav.request_descend(None, TINT),
            Err(NavigationError::NoFocus)
        );
        assert!(nav.is_idle());
    }

    #[test]
    fn ascend_at_max_level_is_rejected() {
        let mut nav = LevelNavigator::new(0, 2, 2);
        let before = nav.context();
        assert_eq!(nav.request_ascend(TINT), Err(NavigationError::AtMaxLevel(2)));
        assert_eq!(nav.context(), before);
        assert!(nav.is_idle());
    }

    #[test]
    fn ascend_refocuses_parent_and_descend_returns_to_it() {
        let mut nav = LevelNavigator::new(0, 2, 2);
        let parent = Hex::new(-1, 2);
        nav.request_descend(Some(parent), TINT).unwrap();
        finish_descend(&mut nav);

        assert_eq!(nav.request_ascend(TINT).unwrap(), vec![NavEffect::FadeIn { tint: TINT }]);
        let effects = finish_ascend(&mut nav);
        assert!(effects.contains(&NavEffect::FetchTiles {
            level: 2,
            parent: None
        }));
        assert!(effects.contains(&NavEffect::FrameCamera { focus: parent }));
        assert!(effects.contains(&NavEffect::PlaceAvatar { at: parent }));
        assert_eq!(
            nav.context(),
            NavigationContext {
                level: 2,
                parent: None
            }
        );

        nav.request_descend(Some(parent), TINT).unwrap();
        finish_descend(&mut nav);
        assert_eq!(nav.context().parent, Some(parent));
    }

    #[test]
    fn ascend_restores_outer_parent() {
        let mut nav = LevelNavigator::new(0, 3, 3);
        nav.request_descend(Some(Hex::new(1, 0)), TINT).unwrap();
        finish_descend(&mut nav);
        nav.request_descend(Some(Hex::new(0, -1)), TINT).unwrap();
        finish_descend(&mut nav);
        assert_eq!(nav.context().level, 1);

        nav.request_ascend(TINT).unwrap();
        let effects = finish_ascend(&mut nav);
        assert!(effects.contains(&NavEffect::FetchTiles {
            level: 2,
            parent: Some(Hex::new(1, 0))
        }));
        assert!(effects.contains(&NavEffect::FrameCamera {
            focus: Hex::new(0, -1)
        }));
    }

    #[test]
    fn ascend_without_lineage_refocuses_origin() {
        let mut nav = LevelNavigator::new(0, 2, 1);
        nav.request_ascend(TINT).unwrap();
        let effects = finish_ascend(&mut nav);
        assert!(effects.contains(&NavEffect::FrameCamera { focus: Hex::ZERO }));
        assert_eq!(nav.context().level, 2);
    }

    #[test]
    fn context_is_unchanged_until_commit() {
        let mut nav = LevelNavigator::new(0, 2, 1);
        nav.request_ascend(TINT).unwrap();
        assert_eq!(nav.context().level, 1);
        nav.signal(NavSignal::FadeInDone);
        assert_eq!(nav.context().level, 2);
    }

    #[test]
    fn stray_signals_are_ignored() {
        let mut nav = LevelNavigator::new(0, 2, 2);
        assert!(nav.signal(NavSignal::TilesSettled).is_empty());
        assert!(nav.signal(NavSignal::FadeOutDone).is_empty());
        assert!(nav.is_idle());

        nav.request_descend(Some(Hex::ZERO), TINT).unwrap();
        assert!(nav.signal(NavSignal::TilesSettled).is_empty());
        assert!(nav.signal(NavSignal::FadeOutDone).is_empty());
        assert_eq!(nav.context().level, 2);
        assert!(matches!(
            nav.phase(),
            Phase::Transitioning {
                step: Step::Approach { .. },
                ..
            }
        ));
    }

    #[test]
    fn failed_fetch_still_fades_out() {
        let mut nav = LevelNavigator::new(0, 2, 2);
        nav.request_descend(Some(Hex::ZERO), TINT).unwrap();
        nav.signal(NavSignal::CameraArrived);
        nav.signal(NavSignal::FadeInDone);
        // The scene reports settled with an empty set after a failure.
        let effects = nav.signal(NavSignal::TilesSettled);
        assert_eq!(effects.last(), Some(&NavEffect::FadeOut));
        nav.signal(NavSignal::FadeOutDone);
        assert!(nav.is_idle());
    }
}

//! Classification of new windows against the configured rule table.
use crate::tag::TagMask;

/// Placeholder used when a window has no class hint.
pub const BROKEN: &str = "broken";

/// Lowest and highest cfact a rule (or the user) may set.
pub const CFACT_MIN: f32 = 0.25;
pub const CFACT_MAX: f32 = 4.0;

/// A declarative match on WM_CLASS and the title, with the classification to apply.
#[derive(Debug, Clone, PartialEq)]
pub struct Rule {
    pub class: Option<&'static str>,
    pub instance: Option<&'static str>,
    pub title: Option<&'static str>,
    pub tags: TagMask,
    pub floating: bool,
    pub terminal: bool,
    /// Monitor index, or -1 for the selected monitor
    pub monitor: i32,
    pub left: bool,
    /// Only applied when in the valid cfact range
    pub cfact: f32,
    /// Opacity while unfocused, negative for none
    pub opacity: f64,
    pub no_swallow: bool,
    pub keyboard: bool,
}

impl Default for Rule {
    fn default() -> Rule {
        Rule {
            class: None,
            instance: None,
            title: None,
            tags: 0,
            floating: false,
            terminal: false,
            monitor: -1,
            left: false,
            cfact: 0.0,
            opacity: -1.0,
            no_swallow: false,
            keyboard: false,
        }
    }
}

impl Rule {
    pub fn matches(&self, class: &str, instance: &str, title: &str) -> bool {
        self.title.map_or(true, |t| title.contains(t))
            && self.class.map_or(true, |c| class.contains(c))
            && self.instance.map_or(true, |i| instance.contains(i))
    }
}

/// What the rules decided about a window.
#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    pub tags: TagMask,
    pub floating: bool,
    pub terminal: bool,
    pub left: bool,
    pub cfact: Option<f32>,
    pub opacity: Option<f64>,
    pub no_swallow: bool,
    pub keyboard: bool,
    pub monitor: Option<usize>,
}

/// The view state of the monitor a window is classified on.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TagContext {
    /// Mask of all configured tags
    pub all_tags: TagMask,
    /// The tag new windows are created on
    pub create_tag: TagMask,
    /// The currently viewed tags
    pub tagset: TagMask,
    pub num_monitors: usize,
}

/**
 * Run every matching rule in order.
 *
 * Each match overwrites the boolean flags and the opacity, adds its tags and
 * can only ever set (never clear) the left column flag. cfact and monitor are
 * taken only when valid. A window that ends up on no tag goes to the create
 * tag, or failing that the current view.
 */
pub fn apply_rules(
    rules: &[Rule],
    class: Option<&str>,
    instance: Option<&str>,
    title: &str,
    ctx: &TagContext,
) -> Classification {
    let class = class.unwrap_or(BROKEN);
    let instance = instance.unwrap_or(BROKEN);
    let mut c = Classification {
        tags: 0,
        floating: false,
        terminal: false,
        left: false,
        cfact: None,
        opacity: None,
        no_swallow: false,
        keyboard: false,
        monitor: None,
    };

    for r in rules.iter().filter(|r| r.matches(class, instance, title)) {
        c.terminal = r.terminal;
        c.floating = r.floating;
        c.no_swallow = r.no_swallow;
        c.keyboard = r.keyboard;
        c.opacity = if r.opacity >= 0.0 { Some(r.opacity) } else { None };
        c.tags |= r.tags;
        c.left |= r.left;
        if (CFACT_MIN..=CFACT_MAX).contains(&r.cfact) {
            c.cfact = Some(r.cfact);
        }
        if r.monitor >= 0 && (r.monitor as usize) < ctx.num_monitors {
            c.monitor = Some(r.monitor as usize);
        }
    }

    c.tags &= ctx.all_tags;
    if c.tags == 0 {
        c.tags = ctx.create_tag & ctx.all_tags;
    }
    if c.tags == 0 {
        c.tags = ctx.tagset;
    }

    c
}

// Rule system. Implementations are grouped by what they format:
// - rule.rs: the Rule trait and per-rule state (metadata + live configuration)
// - font.rs, paragraph.rs, table.rs, page.rs: the built-in rules
// - engine.rs: registry and execution runs

pub mod engine;
pub mod font;
pub mod page;
pub mod paragraph;
pub mod rule;
pub mod table;

pub use engine::RuleEngine;
pub use font::{FontColorRule, FontNameRule, FontSizeRule, TitleFontRule};
pub use page::PageLayoutRule;
pub use paragraph::{
    HorizontalRuleRemovalRule, ListNumberingRule, ParagraphSpacingRule, TitleAlignmentRule,
    TitleBoldRule,
};
pub use rule::{Rule, RuleCategory, RuleState};
pub use table::{TableBorderRule, TableBordersRule, TableWidthRule};

use crate::schema::ParamMap;

pub type RuleConstructor = fn(Option<ParamMap>) -> anyhow::Result<Box<dyn Rule>>;

/// One entry of a static registration table.
#[derive(Clone, Copy)]
pub struct RuleRegistration {
    pub id: &'static str,
    pub construct: RuleConstructor,
}

impl std::fmt::Debug for RuleRegistration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RuleRegistration").field("id", &self.id).finish()
    }
}

fn boxed<R: Rule + 'static>(rule: R) -> anyhow::Result<Box<dyn Rule>> {
    Ok(Box::new(rule))
}

/// Built-in rules in registry order. Page geometry goes first so table
/// widths are computed against the final available width.
pub static BUILTIN_RULES: &[RuleRegistration] = &[
    RuleRegistration {
        id: PageLayoutRule::ID,
        construct: |config| boxed(PageLayoutRule::new(config)),
    },
    RuleRegistration {
        id: FontColorRule::ID,
        construct: |config| boxed(FontColorRule::new(config)),
    },
    RuleRegistration {
        id: FontNameRule::ID,
        construct: |config| boxed(FontNameRule::new(config)),
    },
    RuleRegistration {
        id: TitleFontRule::ID,
        construct: |config| boxed(TitleFontRule::new(config)),
    },
    RuleRegistration {
        id: FontSizeRule::ID,
        construct: |config| boxed(FontSizeRule::new(config)),
    },
    RuleRegistration {
        id: ParagraphSpacingRule::ID,
        construct: |config| boxed(ParagraphSpacingRule::new(config)),
    },
    RuleRegistration {
        id: TitleBoldRule::ID,
        construct: |config| boxed(TitleBoldRule::new(config)),
    },
    RuleRegistration {
        id: TitleAlignmentRule::ID,
        construct: |config| boxed(TitleAlignmentRule::new(config)),
    },
    RuleRegistration {
        id: ListNumberingRule::ID,
        construct: |config| boxed(ListNumberingRule::new(config)),
    },
    RuleRegistration {
        id: HorizontalRuleRemovalRule::ID,
        construct: |config| boxed(HorizontalRuleRemovalRule::new(config)),
    },
    RuleRegistration {
        id: TableWidthRule::ID,
        construct: |config| boxed(TableWidthRule::new(config)),
    },
    RuleRegistration {
        id: TableBorderRule::ID,
        construct: |config| boxed(TableBorderRule::new(config)),
    },
    RuleRegistration {
        id: TableBordersRule::ID,
        construct: |config| boxed(TableBordersRule::new(config)),
    },
];

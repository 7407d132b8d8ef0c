use std::fmt;

/// A location in an HTML document at which script content is injected.
///
/// Variants are declared in resolution order so that directives derived from
/// an Ingress are always emitted in the same sequence, regardless of how its
/// annotations happen to be ordered.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum InjectionPoint {
    HeadEnd,
    HeadStart,
    BodyStart,
    BodyEnd,
}

/// A single `sub_filter` directive produced for one injection point.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Directive(String);

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Side {
    /// The script is placed before the anchor, e.g. `<script></head>`.
    Before,
    /// The script is placed after the anchor, e.g. `<body><script>`.
    After,
}

struct Template {
    name: &'static str,
    annotation: &'static str,
    anchor: &'static str,
    side: Side,
}

// Indexed by `InjectionPoint as usize`; must stay in declaration order.
const TEMPLATES: [Template; 4] = [
    Template {
        name: "head-end",
        annotation: "digitalist.cloud/add-script-head-end",
        anchor: "</head>",
        side: Side::Before,
    },
    Template {
        name: "head-start",
        annotation: "digitalist.cloud/add-script-head-start",
        anchor: "<head>",
        side: Side::After,
    },
    Template {
        name: "body-start",
        annotation: "digitalist.cloud/add-script-body-start",
        anchor: "<body>",
        side: Side::After,
    },
    Template {
        name: "body-end",
        annotation: "digitalist.cloud/add-script-body-end",
        anchor: "</body>",
        side: Side::Before,
    },
];

// === impl InjectionPoint ===

impl InjectionPoint {
    /// All injection points, in resolution order.
    pub const ALL: [Self; 4] = [
        Self::HeadEnd,
        Self::HeadStart,
        Self::BodyStart,
        Self::BodyEnd,
    ];

    #[inline]
    fn template(self) -> &'static Template {
        &TEMPLATES[self as usize]
    }

    /// The Ingress annotation whose value names this point's script source.
    pub fn annotation(self) -> &'static str {
        self.template().annotation
    }

    /// The HTML anchor the script is placed next to.
    pub fn anchor(self) -> &'static str {
        self.template().anchor
    }

    pub fn as_str(self) -> &'static str {
        self.template().name
    }

    /// Formats the `sub_filter` directive that places `script` next to this
    /// point's anchor, keeping the anchor itself in the output.
    pub fn directive(self, script: &str) -> Directive {
        let Template { anchor, side, .. } = self.template();
        let replacement = match side {
            Side::Before => format!("{script}{anchor}"),
            Side::After => format!("{anchor}{script}"),
        };
        Directive(format!("sub_filter '{anchor}' '{replacement}';"))
    }
}

impl fmt::Display for InjectionPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.as_str().fmt(f)
    }
}

// === impl Directive ===

impl Directive {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for Directive {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Directive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

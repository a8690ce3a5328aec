#[derive(Clone, Copy, Debug)]
pub(crate) struct CommandSpec {
    pub command: &'static str,
    pub action: &'static str,
}

/// Commands whose whole remainder is one setting value.
pub(crate) const SETTING_COMMANDS: &[CommandSpec] = &[
    CommandSpec {
        command: "ratio",
        action: "set_aspect_ratio",
    },
    CommandSpec {
        command: "aspect",
        action: "set_aspect_ratio",
    },
    CommandSpec {
        command: "resolution",
        action: "set_resolution",
    },
    CommandSpec {
        command: "res",
        action: "set_resolution",
    },
    CommandSpec {
        command: "style",
        action: "set_style",
    },
];

pub(crate) const SINGLE_PATH_COMMANDS: &[CommandSpec] = &[CommandSpec {
    command: "attach",
    action: "attach",
}];

pub(crate) const NO_ARG_COMMANDS: &[CommandSpec] = &[
    CommandSpec {
        command: "detach",
        action: "detach",
    },
    CommandSpec {
        command: "send",
        action: "send_attachment",
    },
    CommandSpec {
        command: "styles",
        action: "list_styles",
    },
    CommandSpec {
        command: "settings",
        action: "show_settings",
    },
    CommandSpec {
        command: "history",
        action: "show_history",
    },
    CommandSpec {
        command: "key",
        action: "select_key",
    },
    CommandSpec {
        command: "help",
        action: "help",
    },
];

pub const CHAT_HELP_COMMANDS: &[&str] = &[
    "/ratio",
    "/resolution",
    "/style",
    "/styles",
    "/settings",
    "/attach",
    "/detach",
    "/send",
    "/history",
    "/key",
    "/help",
];

// groupsconnector/src/console/menu.rs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuChoice {
    Invalid,
    CreateConnection,
    ChooseExistingConnection,
    DeleteConnection,
    RegisterSchema,
    ViewSchema,
    PushUpdatedItems,
    PushAllItems,
    Exit,
}

pub const MENU_ENTRIES: &[(MenuChoice, &str)] = &[
    (MenuChoice::CreateConnection, "Create a connection"),
    (MenuChoice::ChooseExistingConnection, "Select an existing connection"),
    (MenuChoice::DeleteConnection, "Delete current connection"),
    (MenuChoice::RegisterSchema, "Register schema for current connection"),
    (MenuChoice::ViewSchema, "View schema for current connection"),
    (MenuChoice::PushUpdatedItems, "Push updated items to current connection"),
    (MenuChoice::PushAllItems, "Push ALL items to current connection"),
    (MenuChoice::Exit, "Exit"),
];

impl MenuChoice {
    pub fn number(self) -> u8 {
        match self {
            MenuChoice::Invalid => 0,
            MenuChoice::CreateConnection => 1,
            MenuChoice::ChooseExistingConnection => 2,
            MenuChoice::DeleteConnection => 3,
            MenuChoice::RegisterSchema => 4,
            MenuChoice::ViewSchema => 5,
            MenuChoice::PushUpdatedItems => 6,
            MenuChoice::PushAllItems => 7,
            MenuChoice::Exit => 8,
        }
    }

    /// Anything that is not one of the listed numbers is `Invalid`.
    pub fn parse(input: &str) -> Self {
        let Ok(number) = input.trim().parse::<u8>() else {
            return MenuChoice::Invalid;
        };
        MENU_ENTRIES
            .iter()
            .map(|(choice, _)| *choice)
            .find(|choice| choice.number() == number)
            .unwrap_or(MenuChoice::Invalid)
    }
}

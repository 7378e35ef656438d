use strum_macros::Display;

#[derive(Debug, Copy, Clone, Eq, PartialEq, Display)]
#[strum(serialize_all = "lowercase")]
pub enum Role {
    Admin = 1,
    Teacher = 2,
}

impl Role {
    pub fn id(self) -> u8 {
        self as u8
    }
}

//! User-facing reply strings.
//!
//! Kept apart from the command flow so deployments can swap wording or
//! language without touching handler logic. Handlers never format their own
//! replies.

#[derive(Clone, Debug)]
pub struct MessageCatalog {
    pub provide_apartment: String,
    pub invalid_apartment: String,
    pub no_sender_identity: String,
    pub store_failure: String,
    pub nobody_in_apartment: String,
    pub nobody_in_chat: String,
    pub goodbye: String,
    pub start: String,
    pub help: String,
    pub unknown: String,
    pub batch_failed: String,
}

impl Default for MessageCatalog {
    fn default() -> Self {
        Self {
            provide_apartment: "Please provide an apartment number, e.g. /setapt 42".to_string(),
            invalid_apartment: "Apartment number is incorrect".to_string(),
            no_sender_identity: "Sorry, I cannot tell who sent this".to_string(),
            store_failure: "Sorry, something went wrong :(".to_string(),
            nobody_in_apartment: "Nobody lives here :)".to_string(),
            nobody_in_chat: "Nobody has registered an apartment in this chat yet".to_string(),
            goodbye: "Done, your apartment record is gone. Bye!".to_string(),
            start: "Hello! I keep track of who lives in which apartment in this chat.\n\
                    Send /help for the list of commands."
                .to_string(),
            help: "Commands:\n\
                   /setapt <number> - register your apartment\n\
                   /aptcontacts <number> - who lives in an apartment\n\
                   /aptslist - full list of residents, sent to you privately\n\
                   /delme - remove your record\n\n\
                   Note: /aptslist arrives as a private message, so open a private\n\
                   chat with me and send /start there first."
                .to_string(),
            unknown: "I did not understand that. Send /help for the list of commands.".to_string(),
            batch_failed: "Sending the apartment list failed, please try again later".to_string(),
        }
    }
}

impl MessageCatalog {
    pub fn registered(&self, apartment: u32) -> String {
        format!("Got it! You are registered in apartment {apartment}.")
    }

    pub fn moved(&self, from: u32, to: u32) -> String {
        format!("Got it! Moved you from apartment {from} to apartment {to}.")
    }
}

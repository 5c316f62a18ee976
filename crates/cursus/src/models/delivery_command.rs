/*
 *  Copyright 2025-2026 Colliery Software
 *
 *  Licensed under the Apache License, Version 2.0 (the "License");
 *  you may not use this file except in compliance with the License.
 *  You may obtain a copy of the License at
 *
 *      http://www.apache.org/licenses/LICENSE-2.0
 *
 *  Unless required by applicable law or agreed to in writing, software
 *  distributed under the License is distributed on an "AS IS" BASIS,
 *  WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 *  See the License for the specific language governing permissions and
 *  limitations under the License.
 */

//! Delivery Command Vocabulary
//!
//! The queue stores the delivery verb as a free string so unknown or future
//! verbs pass through untouched; this enum is the typed vocabulary publishers
//! normally use when enqueueing.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CommandParseError;

/// Delivery verbs understood by federation endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DeliveryCommand {
    /// Deliver a newly published post
    WallNew,
    /// Deliver a private message
    Mail,
    /// Deliver a contact suggestion
    Suggest,
    /// Announce that the sending account moved servers
    Relocate,
    /// Announce account removal
    RemoveMe,
    /// Retract previously delivered content
    Drop,
    /// Deliver a profile update
    ProfileUpdate,
}

impl DeliveryCommand {
    /// The wire string stored in the queue's `command` column.
    pub fn as_str(&self) -> &'static str {
        match self {
            DeliveryCommand::WallNew => "wall-new",
            DeliveryCommand::Mail => "mail",
            DeliveryCommand::Suggest => "suggest",
            DeliveryCommand::Relocate => "relocate",
            DeliveryCommand::RemoveMe => "removeme",
            DeliveryCommand::Drop => "drop",
            DeliveryCommand::ProfileUpdate => "profileupdate",
        }
    }
}

impl fmt::Display for DeliveryCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DeliveryCommand {
    type Err = CommandParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "wall-new" => Ok(DeliveryCommand::WallNew),
            "mail" => Ok(DeliveryCommand::Mail),
            "suggest" => Ok(DeliveryCommand::Suggest),
            "relocate" => Ok(DeliveryCommand::Relocate),
            "removeme" => Ok(DeliveryCommand::RemoveMe),
            "drop" => Ok(DeliveryCommand::Drop),
            "profileupdate" => Ok(DeliveryCommand::ProfileUpdate),
            other => Err(CommandParseError(other.to_string())),
        }
    }
}

impl From<DeliveryCommand> for String {
    fn from(command: DeliveryCommand) -> Self {
        command.as_str().to_string()
    }
}

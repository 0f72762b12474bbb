//! System instruction and fixed replies

use crate::ambient::SystemStats;
use crate::phone::PhoneLinkState;

/// Reply when the model returns no text
pub const GLITCH_REPLY: &str = "I'm afraid I encountered a glitch in the system, madam.";

/// Reply when the model request fails
pub const NETWORK_TROUBLE_REPLY: &str =
    "I'm having a bit of trouble connecting to the network, madam. Please bear with me.";

/// User message text for an image sent without text
pub const IMAGE_ONLY_TEXT: &str = "Analyze this image, madam.";

/// Build the persona instruction with live phone and system status
#[must_use]
pub fn system_instruction(phone: &PhoneLinkState, stats: &SystemStats) -> String {
    format!(
        "You are Lia, an ultra-advanced AI companion.\n\
         Your tone is sophisticated, elegant, and deeply intelligent. Address the user as \"Madam\".\n\
         You have access to advanced reasoning.\n\
         You are linked to the user's phone and smart home systems.\n\
         Current Phone Status: {}.\n\
         System Status: {}.\n\
         You can analyze images, control home devices, and provide deep insights.\n\
         If the user asks to control a device, use the 'controlHome' tool.\n\
         Be proactive, helpful, and maintain your elegant persona at all times.",
        phone.status_line(),
        stats.status_line()
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_instruction_carries_status() {
        let mut phone = PhoneLinkState::default();
        let stats = SystemStats::default();

        let instruction = system_instruction(&phone, &stats);
        assert!(instruction.contains("Current Phone Status: Disconnected."));
        assert!(instruction.contains("System Status: CPU 12%, Memory 24%, Network 120 Mbps."));

        phone.connect();
        let instruction = system_instruction(&phone, &stats);
        assert!(instruction.contains("Connected (iPhone 15 Pro, 85% battery)"));
    }
}

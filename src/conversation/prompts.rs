//! Customer-facing message texts for each step of the conversation.

use super::intent::{Choice, ChoiceId, Intent, ListRow, ListSection};
use crate::delivery::DeliveryVerdict;

/// First-ever message from a customer: greeting plus the registration offer.
pub fn welcome_offer(greeting_name: &str, bonus: u32) -> Intent {
    Intent::choice(
        format!(
            "Welcome {greeting_name}! 🎉\n\n\
             I'm your food ordering assistant. Let's get you started with a quick registration.\n\n\
             You'll earn {bonus} bonus points! 🎁"
        ),
        vec![Choice::new(ChoiceId::Register, "✅ Start Registration")],
    )
}

/// Registration offer for a customer who has written before.
pub fn registration_offer(bonus: u32) -> Intent {
    Intent::choice(
        format!(
            "Let's finish setting up your account so you can order.\n\n\
             Register now and earn {bonus} bonus points! 🎁"
        ),
        vec![Choice::new(ChoiceId::Register, "✅ Start Registration")],
    )
}

pub fn ask_name() -> Intent {
    Intent::text("Great! Let's start with your name.\n\nWhat's your full name?")
}

pub fn email_opt_in(name: &str) -> Intent {
    Intent::choice(
        format!(
            "Nice to meet you, {name}! 👋\n\n\
             Would you like to provide your email for order receipts and exclusive offers?"
        ),
        vec![
            Choice::new(ChoiceId::Yes, "Yes, add email"),
            Choice::new(ChoiceId::Skip, "Skip for now"),
        ],
    )
}

pub fn ask_email() -> Intent {
    Intent::text("Please enter your email address:")
}

pub fn invalid_email() -> Intent {
    Intent::text("Please enter a valid email address or type \"skip\" to continue without email.")
}

pub fn registration_complete(name: &str, bonus: u32, balance: u32) -> Intent {
    Intent::text(format!(
        "🎉 Registration complete, {name}!\n\n\
         ✅ You've earned {bonus} bonus points\n\
         💰 Current balance: {balance} points\n\n\
         Next, we'll need your delivery address."
    ))
}

pub fn address_method() -> Intent {
    Intent::choice(
        "How would you like to provide your delivery address?",
        vec![
            Choice::new(ChoiceId::ShareLocation, "📍 Share Location"),
            Choice::new(ChoiceId::TypeAddress, "📝 Type Address"),
        ],
    )
}

pub fn request_location() -> Intent {
    Intent::LocationRequest {
        body: "📍 Please share your current location so we can check delivery to you.".into(),
    }
}

pub fn ask_free_text() -> Intent {
    Intent::text(
        "Please type your complete address:\n\n\
         Include:\n\
         • House/Building number\n\
         • Street name\n\
         • Area\n\
         • City and Pincode",
    )
}

pub fn ask_details() -> Intent {
    Intent::text(
        "📍 Got your location!\n\n\
         Please provide additional details:\n\
         • Building/House name\n\
         • Floor number\n\
         • Landmark\n\
         • Delivery instructions",
    )
}

/// Confirmation prompt with the draft and delivery terms. `offer_confirm`
/// false leaves only the change choice.
pub fn confirm_address(draft_display: &str, verdict: &DeliveryVerdict, offer_confirm: bool) -> Intent {
    let mut choices = Vec::with_capacity(2);
    if offer_confirm {
        choices.push(Choice::new(ChoiceId::Confirm, "✅ Confirm"));
    }
    choices.push(Choice::new(ChoiceId::Change, "✏️ Change"));

    Intent::choice(
        format!(
            "Please confirm your delivery address:\n\n{draft_display}\n\n{}",
            verdict.summary()
        ),
        choices,
    )
}

pub fn address_confirmed() -> Intent {
    Intent::text(
        "✅ Address confirmed!\n\n\
         🍕 Great! Now let's take your order.\n\n\
         Type \"MENU\" to see our offerings!",
    )
}

/// Stand-in until menu browsing exists.
pub fn menu_placeholder() -> Intent {
    let row = |id: &str, title: &str| ListRow {
        id: format!("category_{id}"),
        title: title.to_string(),
        description: None,
    };
    Intent::List {
        body: "🍕 Menu coming soon!\n\nFor now, here are our categories:".into(),
        button: "Categories".into(),
        sections: vec![ListSection {
            title: "Categories".into(),
            rows: vec![
                row("pizza", "Pizza"),
                row("burgers", "Burgers"),
                row("beverages", "Beverages"),
            ],
        }],
    }
}

pub fn welcome_back(name: &str, points: u32) -> Intent {
    Intent::text(format!(
        "Welcome back, {name}! 🎉\n\n\
         You have {points} loyalty points.\n\n\
         Type \"MENU\" to start ordering!"
    ))
}

use std::sync::Arc;

use log::{debug, info, warn};
use teloxide::{
    dispatching::{dialogue::ErasedStorage, UpdateHandler},
    prelude::*,
    types::{ChatAction, InputFile, KeyboardButton, KeyboardMarkup},
};

use crate::config::Config;
use crate::quiz::sheets::{HttpSheetSource, QuestionOrigin, QuestionResolver};
use crate::quiz::spelling::{
    sample_meanings, sample_words, SpellMode, SpellVerdict, SpellingDrill, ON_FIRE_STREAK,
};
use crate::quiz::topics::find_by_label;
use crate::quiz::{self, Question, Topic, Verdict};
use crate::story::{GeminiClient, StoryMaker, PROMPT_SUGGESTIONS};

pub type StoryQuizDialogue = Dialogue<State, ErasedStorage<State>>;
pub type HandlerResult = Result<(), Box<dyn std::error::Error + Send + Sync>>;
pub type SheetResolver = QuestionResolver<HttpSheetSource>;
pub type Storyteller = StoryMaker<GeminiClient>;

#[derive(Clone, Default, serde::Serialize, serde::Deserialize)]
pub enum State {
    #[default]
    Start,
    ReceiveFullName,
    ReceiveActivityChoice {
        player_name: String,
    },
    ReceiveStoryPrompt {
        player_name: String,
    },
    ReceiveTopicChoice {
        player_name: String,
    },
    Quiz {
        player_name: String,
        quiz: quiz::Quiz,
    },
    ReceiveSpellMode {
        player_name: String,
    },
    Spelling {
        player_name: String,
        drill: SpellingDrill,
    },
}

const MAKE_STORY: &str = "📖 Make a story";
const TAKE_QUIZ: &str = "🧠 Take a quiz";
const SPELLING: &str = "✏️ Spelling practice";
const BACK: &str = "⬅️ Back";
const HINT: &str = "💡 Hint";
const FULL_WORD: &str = "Spell the whole word";
const FILL_IN: &str = "Fill in the blanks";
const MEANING: &str = "What does it mean?";

const GREETING_TEXT: &str =
    "Hi! I'm the Magic Story Maker. I can write stories for you and quiz you on fun topics! What's your name?";

pub fn schema() -> UpdateHandler<Box<dyn std::error::Error + Send + Sync + 'static>> {
    Update::filter_message()
        .enter_dialogue::<Message, ErasedStorage<State>, State>()
        .branch(dptree::filter(|msg: Message| msg.text() == Some("/start")).endpoint(start))
        .branch(dptree::case![State::Start].endpoint(start))
        .branch(dptree::case![State::ReceiveFullName].endpoint(receive_full_name))
        .branch(
            dptree::case![State::ReceiveActivityChoice { player_name }]
                .endpoint(receive_activity_choice),
        )
        .branch(
            dptree::case![State::ReceiveStoryPrompt { player_name }].endpoint(receive_story_prompt),
        )
        .branch(
            dptree::case![State::ReceiveTopicChoice { player_name }].endpoint(receive_topic_choice),
        )
        .branch(dptree::case![State::Quiz { player_name, quiz }].endpoint(quiz_answer))
        .branch(dptree::case![State::ReceiveSpellMode { player_name }].endpoint(receive_spell_mode))
        .branch(dptree::case![State::Spelling { player_name, drill }].endpoint(spelling_answer))
}

fn single_column(labels: impl IntoIterator<Item = String>) -> KeyboardMarkup {
    KeyboardMarkup::new(
        labels
            .into_iter()
            .map(|label| vec![KeyboardButton::new(label)])
            .collect::<Vec<_>>(),
    )
}

fn menu_keyboard() -> KeyboardMarkup {
    single_column([MAKE_STORY, TAKE_QUIZ, SPELLING].map(String::from))
}

async fn show_menu(
    bot: &Bot,
    dialogue: &StoryQuizDialogue,
    chat_id: ChatId,
    player_name: String,
    text: &str,
) -> HandlerResult {
    bot.send_message(chat_id, text)
        .reply_markup(menu_keyboard())
        .await?;
    dialogue
        .update(State::ReceiveActivityChoice { player_name })
        .await?;
    Ok(())
}

async fn start(bot: Bot, dialogue: StoryQuizDialogue, msg: Message) -> HandlerResult {
    bot.send_message(msg.chat.id, GREETING_TEXT).await?;

    dialogue.update(State::ReceiveFullName).await?;
    Ok(())
}

async fn receive_full_name(bot: Bot, dialogue: StoryQuizDialogue, msg: Message) -> HandlerResult {
    let Some(full_name) = msg.text().map(str::trim).filter(|n| !n.is_empty()) else {
        bot.send_message(msg.chat.id, "Please type your name").await?;
        return Ok(());
    };

    info!("New player {:?} in chat {}", full_name, msg.chat.id);
    let greeting = format!("Nice to meet you, {}! What would you like to do?", full_name);
    show_menu(&bot, &dialogue, msg.chat.id, full_name.to_string(), &greeting).await
}

async fn receive_activity_choice(
    topics: Arc<Vec<Topic>>,
    bot: Bot,
    dialogue: StoryQuizDialogue,
    player_name: String,
    msg: Message,
) -> HandlerResult {
    match msg.text() {
        Some(MAKE_STORY) => {
            let mut options: Vec<String> = PROMPT_SUGGESTIONS.iter().map(|s| s.to_string()).collect();
            options.push(BACK.to_string());
            bot.send_message(
                msg.chat.id,
                "What is our story about? Type your own idea or try a suggestion.",
            )
            .reply_markup(single_column(options))
            .await?;
            dialogue
                .update(State::ReceiveStoryPrompt { player_name })
                .await?;
        }
        Some(TAKE_QUIZ) => {
            let mut options: Vec<String> = topics.iter().map(Topic::button_label).collect();
            options.push(BACK.to_string());
            bot.send_message(msg.chat.id, "Pick a topic")
                .reply_markup(single_column(options))
                .await?;
            dialogue
                .update(State::ReceiveTopicChoice { player_name })
                .await?;
        }
        Some(SPELLING) => {
            bot.send_message(msg.chat.id, "How would you like to practise?")
                .reply_markup(single_column([FULL_WORD, FILL_IN, MEANING, BACK].map(String::from)))
                .await?;
            dialogue
                .update(State::ReceiveSpellMode { player_name })
                .await?;
        }
        _ => {
            bot.send_message(msg.chat.id, "Please choose one of the options")
                .reply_markup(menu_keyboard())
                .await?;
        }
    }
    Ok(())
}

async fn receive_story_prompt(
    story_maker: Arc<Storyteller>,
    bot: Bot,
    dialogue: StoryQuizDialogue,
    player_name: String,
    msg: Message,
) -> HandlerResult {
    let prompt = msg.text().map(str::trim).unwrap_or_default();
    if prompt == BACK {
        return show_menu(&bot, &dialogue, msg.chat.id, player_name, "What next?").await;
    }
    if prompt.is_empty() {
        bot.send_message(msg.chat.id, "Please tell me what the story should be about!")
            .await?;
        return Ok(());
    }

    // Cosmetic only, a failed chat action must not stop the story
    let _ = bot
        .send_chat_action(msg.chat.id, ChatAction::UploadPhoto)
        .await;

    let result = match story_maker.generate(prompt).await {
        Ok(result) => result,
        Err(err) => {
            // Stay in this state so the player can simply send the prompt again
            bot.send_message(msg.chat.id, format!("Oh no! {}", err))
                .await?;
            return Ok(());
        }
    };

    match result.image_bytes() {
        Ok(bytes) => {
            bot.send_photo(msg.chat.id, InputFile::memory(bytes)).await?;
        }
        Err(err) => warn!("Story illustration is not valid base64: {}", err),
    }
    bot.send_message(msg.chat.id, format!("Your Magical Story!\n\n{}", result.story))
        .await?;

    show_menu(
        &bot,
        &dialogue,
        msg.chat.id,
        player_name,
        "Would you like another story or a quiz?",
    )
    .await
}

fn question_text(question: &Question, number: usize, total: usize) -> String {
    let mut text = format!("Question {} of {}\n\n{}", number, total, question.text);
    if let Some(note) = &question.note {
        text.push_str(&format!("\n\n📝 {}", note));
    }
    text
}

async fn send_question(bot: &Bot, chat_id: ChatId, quiz: &quiz::Quiz) -> HandlerResult {
    let Some(question) = quiz.current() else {
        return Ok(());
    };

    let mut options: Vec<String> = question.answers.iter().map(|a| a.label()).collect();
    options.push(BACK.to_string());

    bot.send_message(
        chat_id,
        question_text(question, quiz.current_question + 1, quiz.questions.len()),
    )
    .reply_markup(single_column(options))
    .await?;
    Ok(())
}

async fn receive_topic_choice(
    topics: Arc<Vec<Topic>>,
    resolver: Arc<SheetResolver>,
    config: Arc<Config>,
    bot: Bot,
    dialogue: StoryQuizDialogue,
    player_name: String,
    msg: Message,
) -> HandlerResult {
    let choice = msg.text().unwrap_or_default();
    if choice == BACK {
        return show_menu(&bot, &dialogue, msg.chat.id, player_name, "What next?").await;
    }
    let Some(topic) = find_by_label(&topics, choice) else {
        bot.send_message(msg.chat.id, "Please choose one of the topics")
            .await?;
        return Ok(());
    };

    let _ = bot.send_chat_action(msg.chat.id, ChatAction::Typing).await;

    let resolution = resolver.resolve(topic).await;
    match &resolution.origin {
        QuestionOrigin::Sheet { url } => debug!("{} quiz loaded from {}", topic.id, url),
        QuestionOrigin::Fallback(reason) => {
            debug!("{} quiz uses sample questions: {}", topic.id, reason)
        }
    }
    if resolution.questions.is_empty() {
        bot.send_message(
            msg.chat.id,
            "There are no questions for this topic yet. Please pick another one.",
        )
        .await?;
        return Ok(());
    }

    let mut quiz = quiz::Quiz::new(&topic.id, resolution.questions);
    if config.randomize_questions {
        quiz = quiz.shuffled();
    }

    bot.send_message(
        msg.chat.id,
        format!(
            "{} {}: {} questions. Let's go, {}!",
            topic.icon,
            topic.name,
            quiz.questions.len(),
            player_name
        ),
    )
    .await?;
    send_question(&bot, msg.chat.id, &quiz).await?;

    dialogue.update(State::Quiz { player_name, quiz }).await?;
    Ok(())
}

async fn quiz_answer(
    bot: Bot,
    dialogue: StoryQuizDialogue,
    (player_name, mut quiz): (String, quiz::Quiz),
    msg: Message,
) -> HandlerResult {
    let reply = msg.text().unwrap_or_default();
    if reply == BACK {
        return show_menu(&bot, &dialogue, msg.chat.id, player_name, "Quiz stopped. What next?")
            .await;
    }

    let Some(question) = quiz.current().cloned() else {
        return show_menu(&bot, &dialogue, msg.chat.id, player_name, &quiz.summary()).await;
    };
    let Some(answer) = question.find_answer(reply) else {
        bot.send_message(msg.chat.id, "Please pick one of the answers A, B, C or D")
            .await?;
        return Ok(());
    };

    let feedback = match quiz.answer(&answer.id) {
        Some(Verdict::Correct { streak }) if streak >= ON_FIRE_STREAK => {
            format!("Correct! 🔥 {} in a row! You're on fire!", streak)
        }
        Some(Verdict::Correct { .. }) => "Correct! 🎉".to_string(),
        _ => match question.correct() {
            Some(correct) => format!("Not quite! The right answer is {}", correct.label()),
            None => format!(
                "Not quite! The right answer was {}",
                question.correct_answer
            ),
        },
    };
    bot.send_message(msg.chat.id, feedback).await?;

    if quiz.is_finished() {
        info!(
            "{} finished the {} quiz with {}/{}",
            player_name,
            quiz.topic_id,
            quiz.score,
            quiz.questions.len()
        );
        let summary = quiz.summary();
        return show_menu(&bot, &dialogue, msg.chat.id, player_name, &summary).await;
    }

    send_question(&bot, msg.chat.id, &quiz).await?;
    dialogue.update(State::Quiz { player_name, quiz }).await?;
    Ok(())
}

fn spelling_keyboard() -> KeyboardMarkup {
    single_column([HINT, BACK].map(String::from))
}

async fn receive_spell_mode(
    bot: Bot,
    dialogue: StoryQuizDialogue,
    player_name: String,
    msg: Message,
) -> HandlerResult {
    let drill = match msg.text() {
        Some(FULL_WORD) => SpellingDrill::new(sample_words(), SpellMode::Full),
        Some(FILL_IN) => SpellingDrill::new(sample_words(), SpellMode::FillIn),
        Some(MEANING) => SpellingDrill::meanings(sample_meanings()),
        Some(BACK) => {
            return show_menu(&bot, &dialogue, msg.chat.id, player_name, "What next?").await;
        }
        _ => {
            bot.send_message(msg.chat.id, "Please choose one of the options")
                .await?;
            return Ok(());
        }
    };

    if let Some(prompt) = drill.prompt() {
        bot.send_message(msg.chat.id, prompt)
            .reply_markup(spelling_keyboard())
            .await?;
    }
    dialogue
        .update(State::Spelling { player_name, drill })
        .await?;
    Ok(())
}

async fn spelling_answer(
    bot: Bot,
    dialogue: StoryQuizDialogue,
    (player_name, mut drill): (String, SpellingDrill),
    msg: Message,
) -> HandlerResult {
    let Some(attempt) = msg.text() else {
        bot.send_message(msg.chat.id, "Please type the word").await?;
        return Ok(());
    };
    if attempt == BACK {
        return show_menu(&bot, &dialogue, msg.chat.id, player_name, &drill.summary()).await;
    }
    if attempt == HINT {
        if let Some(hint) = drill.hint() {
            bot.send_message(msg.chat.id, hint).await?;
        }
        return Ok(());
    }

    let feedback = match drill.check(attempt) {
        Some(SpellVerdict::Correct { streak }) if streak >= ON_FIRE_STREAK => {
            format!("Correct! 🔥 {} in a row! You're on fire!", streak)
        }
        Some(SpellVerdict::Correct { .. }) => "Correct! 🎉".to_string(),
        Some(SpellVerdict::Incorrect { expected }) if drill.mode == SpellMode::Meaning => {
            format!("Not quite! It means \"{}\"", expected)
        }
        Some(SpellVerdict::Incorrect { expected }) => {
            format!("Not quite! It is spelled \"{}\"", expected)
        }
        None => String::new(),
    };
    if !feedback.is_empty() {
        bot.send_message(msg.chat.id, feedback).await?;
    }

    if drill.is_finished() {
        let summary = drill.summary();
        return show_menu(&bot, &dialogue, msg.chat.id, player_name, &summary).await;
    }

    if let Some(prompt) = drill.prompt() {
        bot.send_message(msg.chat.id, prompt)
            .reply_markup(spelling_keyboard())
            .await?;
    }
    dialogue
        .update(State::Spelling { player_name, drill })
        .await?;
    Ok(())
}

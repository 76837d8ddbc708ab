//! Keyboard input handling for the TUI.
//!
//! This module handles all keyboard events and translates them into
//! application state changes.

use crossterm::event::{KeyCode, KeyEvent};

use crate::app::{can_add_email_char, can_add_password_char, App, AppState, LoginFocus, Tab};

/// Handle keyboard input. Returns true if the app should quit.
pub fn handle_input(app: &mut App, key: KeyEvent) -> bool {
    if matches!(app.state, AppState::ShowingHelp) {
        if matches!(key.code, KeyCode::Esc | KeyCode::Char('?') | KeyCode::Char('q')) {
            app.state = AppState::Normal;
        }
        return false;
    }

    if app.is_editing_login() {
        handle_login_input(app, key);
        return false;
    }

    match key.code {
        KeyCode::Char('q') => {
            app.state = AppState::Quitting;
            return true;
        }
        KeyCode::Char('?') => {
            app.state = AppState::ShowingHelp;
        }
        KeyCode::Char('1') => app.current_tab = Tab::Projects,
        KeyCode::Char('2') => app.current_tab = Tab::Profile,
        KeyCode::Right | KeyCode::Tab => app.current_tab = app.current_tab.next(),
        KeyCode::Left | KeyCode::BackTab => app.current_tab = app.current_tab.prev(),
        KeyCode::Char('r') => {
            app.status_message = None;
            app.refresh_projects();
        }
        KeyCode::Down | KeyCode::Char('j') if app.current_tab == Tab::Projects => {
            app.select_next_project();
        }
        KeyCode::Up | KeyCode::Char('k') if app.current_tab == Tab::Projects => {
            app.select_prev_project();
        }
        KeyCode::Char('l') if app.current_tab == Tab::Profile && app.session_state.is_logged_in() => {
            app.logout();
        }
        _ => {}
    }

    false
}

fn handle_login_input(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => {
            // Leave the form without discarding what was typed
            app.current_tab = Tab::Projects;
        }
        KeyCode::Down | KeyCode::Tab => {
            app.login_focus = app.login_focus.next();
        }
        KeyCode::Up | KeyCode::BackTab => {
            app.login_focus = app.login_focus.prev();
        }
        KeyCode::Enter => match app.login_focus {
            LoginFocus::Email => app.login_focus = LoginFocus::Password,
            LoginFocus::Password | LoginFocus::Button => {
                app.login_focus = LoginFocus::Button;
                app.attempt_login();
            }
        },
        KeyCode::Backspace => match app.login_focus {
            LoginFocus::Email => {
                app.login_email.pop();
            }
            LoginFocus::Password => {
                app.login_password.pop();
            }
            LoginFocus::Button => {}
        },
        KeyCode::Char(c) => match app.login_focus {
            LoginFocus::Email => {
                if can_add_email_char(app.login_email.chars().count(), c) {
                    app.login_email.push(c);
                }
            }
            LoginFocus::Password => {
                if can_add_password_char(app.login_password.chars().count(), c) {
                    app.login_password.push(c);
                }
            }
            LoginFocus::Button => {}
        },
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::KeyModifiers;
    use projectdeck_core::{ApiClient, Config, MemoryStore, SessionManager};
    use std::sync::Arc;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    async fn test_app() -> App {
        let session = SessionManager::new(Arc::new(MemoryStore::new()));
        session.ready().await;
        let api = ApiClient::new("http://127.0.0.1:9").unwrap();
        let mut app = App::new(Config::default(), session, api);
        app.check_background_tasks();
        app.login_email.clear();
        app
    }

    #[tokio::test]
    async fn test_tab_switching() {
        let mut app = test_app().await;

        handle_input(&mut app, key(KeyCode::Char('2')));
        assert_eq!(app.current_tab, Tab::Profile);

        // Now on the login form, so Esc goes back rather than '1'
        handle_input(&mut app, key(KeyCode::Esc));
        assert_eq!(app.current_tab, Tab::Projects);

        handle_input(&mut app, key(KeyCode::Right));
        assert_eq!(app.current_tab, Tab::Profile);
    }

    #[tokio::test]
    async fn test_typing_into_login_form() {
        let mut app = test_app().await;
        app.current_tab = Tab::Profile;

        for c in "ana@x.io".chars() {
            handle_input(&mut app, key(KeyCode::Char(c)));
        }
        handle_input(&mut app, key(KeyCode::Tab));
        for c in "pw".chars() {
            handle_input(&mut app, key(KeyCode::Char(c)));
        }
        handle_input(&mut app, key(KeyCode::Backspace));

        assert_eq!(app.login_email, "ana@x.io");
        assert_eq!(app.login_password, "p");
        assert_eq!(app.login_focus, LoginFocus::Password);
    }

    #[tokio::test]
    async fn test_q_in_form_is_text() {
        let mut app = test_app().await;
        app.current_tab = Tab::Profile;

        let quit = handle_input(&mut app, key(KeyCode::Char('q')));

        assert!(!quit);
        assert_eq!(app.login_email, "q");
        assert_eq!(app.state, AppState::Normal);
    }

    #[tokio::test]
    async fn test_quit_and_help() {
        let mut app = test_app().await;

        handle_input(&mut app, key(KeyCode::Char('?')));
        assert_eq!(app.state, AppState::ShowingHelp);
        handle_input(&mut app, key(KeyCode::Esc));
        assert_eq!(app.state, AppState::Normal);

        assert!(handle_input(&mut app, key(KeyCode::Char('q'))));
        assert_eq!(app.state, AppState::Quitting);
    }

    #[tokio::test]
    async fn test_enter_on_empty_form_shows_error() {
        let mut app = test_app().await;
        app.current_tab = Tab::Profile;
        app.login_focus = LoginFocus::Button;

        handle_input(&mut app, key(KeyCode::Enter));

        assert!(app.login_error.is_some());
        assert!(!app.login_in_progress);
    }

    #[tokio::test]
    async fn test_logout_key() {
        let mut app = test_app().await;
        app.session.login("abc123").unwrap().await;
        app.check_background_tasks();
        app.current_tab = Tab::Profile;

        handle_input(&mut app, key(KeyCode::Char('l')));

        assert!(!app.session.state().is_logged_in());
    }
}

use crate::application::error::{ErrorReport, HttpError};
use crate::application::pagination::Page;
use crate::application::posts::{PostForm, PostFormChoices};
use crate::domain::entities::{CommentListing, PostListing, UserRecord};
use crate::domain::visibility;
use askama::{Error as AskamaError, Template};
use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use thiserror::Error;
use time::{OffsetDateTime, format_description::BorrowedFormatItem, macros::format_description};

const DISPLAY_DATE: &[BorrowedFormatItem<'static>] =
    format_description!("[day padding:none] [month repr:long] [year], [hour]:[minute]");
const ISO_DATE: &[BorrowedFormatItem<'static>] =
    format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]Z");
const EXCERPT_WORDS: usize = 30;

#[derive(Debug, Error)]
#[error("{public_message}")]
pub struct TemplateRenderError {
    pub(crate) source: &'static str,
    pub(crate) public_message: &'static str,
    #[source]
    pub(crate) error: AskamaError,
}

impl TemplateRenderError {
    pub fn new(source: &'static str, public_message: &'static str, error: AskamaError) -> Self {
        Self {
            source,
            public_message,
            error,
        }
    }
}

impl From<TemplateRenderError> for HttpError {
    fn from(err: TemplateRenderError) -> Self {
        let TemplateRenderError {
            source,
            public_message,
            error,
        } = err;

        HttpError::from_error(
            source,
            StatusCode::INTERNAL_SERVER_ERROR,
            public_message,
            &error,
        )
    }
}

pub fn render_template<T: Template>(template: T) -> Result<Html<String>, HttpError> {
    template.render().map(Html).map_err(|err| {
        TemplateRenderError::new(
            "presentation::views::render_template",
            "Template rendering failed",
            err,
        )
        .into()
    })
}

pub fn render_template_response<T: Template>(template: T, status: StatusCode) -> Response {
    match render_template(template) {
        Ok(html) => (status, html).into_response(),
        Err(err) => err.into_response(),
    }
}

pub fn render_not_found_response(chrome: LayoutChrome) -> Response {
    let content = ErrorPageView::not_found();
    let view = LayoutContext::new(chrome.with_title(content.title.clone()), content);
    let mut response = render_template_response(ErrorTemplate { view }, StatusCode::NOT_FOUND);
    ErrorReport::from_message(
        "presentation::views::render_not_found_response",
        StatusCode::NOT_FOUND,
        "Resource not found",
    )
    .attach(&mut response);
    response
}

/// Human readable timestamp used across feeds and comments.
pub fn display_date(value: OffsetDateTime) -> String {
    value.format(DISPLAY_DATE).unwrap_or_default()
}

pub fn iso_date(value: OffsetDateTime) -> String {
    value.format(ISO_DATE).unwrap_or_default()
}

/// First words of a post body, with an ellipsis when cut.
pub fn excerpt(text: &str) -> String {
    let mut words = text.split_whitespace();
    let head: Vec<&str> = words.by_ref().take(EXCERPT_WORDS).collect();
    let mut out = head.join(" ");
    if words.next().is_some() {
        out.push_str(" …");
    }
    out
}

#[derive(Clone)]
pub struct ViewerBadge {
    pub username: String,
    pub profile_href: String,
    pub is_superuser: bool,
}

#[derive(Clone)]
pub struct LayoutChrome {
    pub site_title: String,
    pub page_title: String,
    pub viewer: Option<ViewerBadge>,
    pub year: i32,
}

impl LayoutChrome {
    pub fn new(site_title: &str, viewer: Option<&UserRecord>) -> Self {
        Self {
            site_title: site_title.to_string(),
            page_title: site_title.to_string(),
            viewer: viewer.map(|user| ViewerBadge {
                username: user.username.clone(),
                profile_href: profile_href(&user.username),
                is_superuser: user.is_superuser,
            }),
            year: OffsetDateTime::now_utc().year(),
        }
    }

    pub fn with_title(self, title: impl Into<String>) -> Self {
        let title = title.into();
        let page_title = if title.is_empty() {
            self.site_title.clone()
        } else {
            format!("{title} | {}", self.site_title)
        };
        Self { page_title, ..self }
    }
}

#[derive(Clone)]
pub struct LayoutContext<T> {
    pub site_title: String,
    pub page_title: String,
    pub viewer: Option<ViewerBadge>,
    pub year: i32,
    pub content: T,
}

impl<T> LayoutContext<T> {
    pub fn new(chrome: LayoutChrome, content: T) -> Self {
        Self {
            site_title: chrome.site_title,
            page_title: chrome.page_title,
            viewer: chrome.viewer,
            year: chrome.year,
            content,
        }
    }
}

#[derive(Clone)]
pub struct PostCard {
    pub href: String,
    pub title: String,
    pub excerpt: String,
    pub published: String,
    pub iso_date: String,
    pub author: String,
    pub author_href: String,
    pub category: Option<LinkView>,
    pub location: Option<String>,
    pub comment_count: u64,
    pub is_hidden: bool,
}

impl PostCard {
    /// `now` decides whether the card is flagged as not publicly visible.
    pub fn from_listing(listing: &PostListing, now: OffsetDateTime) -> Self {
        let post = &listing.post;
        Self {
            href: format!("/posts/{}", post.id),
            title: post.title.clone(),
            excerpt: excerpt(&post.text),
            published: display_date(post.pub_date),
            iso_date: iso_date(post.pub_date),
            author: listing.author_username.clone(),
            author_href: profile_href(&listing.author_username),
            category: listing.category.as_ref().map(|category| LinkView {
                label: category.title.clone(),
                href: format!("/category/{}", category.slug),
            }),
            location: visibility::visible_location(listing).map(|location| location.name.clone()),
            comment_count: listing.comment_count,
            is_hidden: !visibility::is_publicly_visible(
                post,
                listing.category.as_ref(),
                now,
            ),
        }
    }
}

#[derive(Clone)]
pub struct LinkView {
    pub label: String,
    pub href: String,
}

pub fn profile_href(username: &str) -> String {
    format!(
        "/profile/{}",
        percent_encoding::utf8_percent_encode(username, percent_encoding::NON_ALPHANUMERIC)
    )
}

#[derive(Clone)]
pub struct PaginationView {
    pub number: u32,
    pub num_pages: u32,
    pub previous_href: Option<String>,
    pub next_href: Option<String>,
}

impl PaginationView {
    pub fn from_page<T>(page: &Page<T>, base: &str) -> Self {
        Self {
            number: page.number,
            num_pages: page.num_pages,
            previous_href: page.previous_number().map(|n| format!("{base}?page={n}")),
            next_href: page.next_number().map(|n| format!("{base}?page={n}")),
        }
    }

    pub fn is_paginated(&self) -> bool {
        self.num_pages > 1
    }
}

pub struct FeedView {
    pub heading: String,
    pub description: Option<String>,
    pub profile: Option<ProfileHeader>,
    pub posts: Vec<PostCard>,
    pub pagination: PaginationView,
}

impl FeedView {
    pub fn new(
        heading: impl Into<String>,
        page: &Page<PostListing>,
        base: &str,
        now: OffsetDateTime,
    ) -> Self {
        Self {
            heading: heading.into(),
            description: None,
            profile: None,
            posts: page
                .items
                .iter()
                .map(|listing| PostCard::from_listing(listing, now))
                .collect(),
            pagination: PaginationView::from_page(page, base),
        }
    }
}

#[derive(Template)]
#[template(path = "index.html")]
pub struct IndexTemplate {
    pub view: LayoutContext<FeedView>,
}

#[derive(Template)]
#[template(path = "category.html")]
pub struct CategoryTemplate {
    pub view: LayoutContext<FeedView>,
}

pub struct ProfileHeader {
    pub username: String,
    pub full_name: String,
    pub joined: String,
    pub is_owner: bool,
}

impl ProfileHeader {
    pub fn new(user: &UserRecord, is_owner: bool) -> Self {
        Self {
            username: user.username.clone(),
            full_name: user.display_name(),
            joined: display_date(user.date_joined),
            is_owner,
        }
    }
}

#[derive(Template)]
#[template(path = "profile.html")]
pub struct ProfileTemplate {
    pub view: LayoutContext<FeedView>,
}

pub struct CommentView {
    pub id: String,
    pub author: String,
    pub author_href: String,
    pub text: String,
    pub created: String,
    pub edit_href: Option<String>,
    pub delete_href: Option<String>,
}

pub struct PostDetailView {
    pub post: PostCard,
    pub text: String,
    pub can_edit: bool,
    pub edit_href: String,
    pub delete_href: String,
    pub comment_action: Option<String>,
    pub comments: Vec<CommentView>,
}

impl PostDetailView {
    pub fn new(
        listing: &PostListing,
        comments: &[CommentListing],
        viewer: Option<&UserRecord>,
        can_edit: bool,
        now: OffsetDateTime,
    ) -> Self {
        let post_id = listing.post.id;
        let comments = comments
            .iter()
            .map(|entry| {
                let comment = &entry.comment;
                let base = format!("/posts/{post_id}");
                CommentView {
                    id: comment.id.to_string(),
                    author: entry.author_username.clone(),
                    author_href: profile_href(&entry.author_username),
                    text: comment.text.clone(),
                    created: display_date(comment.created_at),
                    edit_href: viewer
                        .filter(|user| visibility::can_edit_comment(comment, user))
                        .map(|_| format!("{base}/edit_comment/{}", comment.id)),
                    delete_href: viewer
                        .filter(|user| visibility::can_delete_comment(comment, user))
                        .map(|_| format!("{base}/delete_comment/{}", comment.id)),
                }
            })
            .collect();

        Self {
            post: PostCard::from_listing(listing, now),
            text: listing.post.text.clone(),
            can_edit,
            edit_href: format!("/posts/{post_id}/edit"),
            delete_href: format!("/posts/{post_id}/delete"),
            comment_action: viewer.map(|_| format!("/posts/{post_id}/comment")),
            comments,
        }
    }
}

#[derive(Template)]
#[template(path = "detail.html")]
pub struct PostDetailTemplate {
    pub view: LayoutContext<PostDetailView>,
}

pub struct SelectOption {
    pub value: String,
    pub label: String,
    pub selected: bool,
}

pub struct PostFormView {
    pub heading: String,
    pub action: String,
    pub submit_label: String,
    pub errors: Vec<String>,
    pub title: String,
    pub text: String,
    pub pub_date: String,
    pub categories: Vec<SelectOption>,
    pub locations: Vec<SelectOption>,
}

impl PostFormView {
    pub fn new(
        heading: &str,
        action: String,
        form: &PostForm,
        choices: &PostFormChoices,
        errors: Vec<String>,
    ) -> Self {
        let categories = choices
            .categories
            .iter()
            .map(|category| {
                let value = category.id.to_string();
                SelectOption {
                    selected: value == form.category.trim(),
                    label: category.title.clone(),
                    value,
                }
            })
            .collect();
        let locations = choices
            .locations
            .iter()
            .map(|location| {
                let value = location.id.to_string();
                SelectOption {
                    selected: value == form.location.trim(),
                    label: location.name.clone(),
                    value,
                }
            })
            .collect();

        Self {
            heading: heading.to_string(),
            action,
            submit_label: heading.to_string(),
            errors,
            title: form.title.clone(),
            text: form.text.clone(),
            pub_date: form.pub_date.clone(),
            categories,
            locations,
        }
    }
}

#[derive(Template)]
#[template(path = "post_form.html")]
pub struct PostFormTemplate {
    pub view: LayoutContext<PostFormView>,
}

pub struct ConfirmDeleteView {
    pub heading: String,
    pub summary: String,
    pub action: String,
    pub cancel_href: String,
}

#[derive(Template)]
#[template(path = "confirm_delete.html")]
pub struct ConfirmDeleteTemplate {
    pub view: LayoutContext<ConfirmDeleteView>,
}

pub struct CommentFormView {
    pub action: String,
    pub cancel_href: String,
    pub text: String,
    pub errors: Vec<String>,
}

#[derive(Template)]
#[template(path = "comment_form.html")]
pub struct CommentFormTemplate {
    pub view: LayoutContext<CommentFormView>,
}

pub struct LoginView {
    pub username: String,
    pub action: String,
    pub errors: Vec<String>,
}

#[derive(Template)]
#[template(path = "login.html")]
pub struct LoginTemplate {
    pub view: LayoutContext<LoginView>,
}

pub struct RegistrationView {
    pub username: String,
    pub email: String,
    pub errors: Vec<String>,
}

#[derive(Template)]
#[template(path = "registration.html")]
pub struct RegistrationTemplate {
    pub view: LayoutContext<RegistrationView>,
}

pub struct PasswordChangeView {
    pub errors: Vec<String>,
}

#[derive(Template)]
#[template(path = "password_change.html")]
pub struct PasswordChangeTemplate {
    pub view: LayoutContext<PasswordChangeView>,
}

pub struct EditProfileView {
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub errors: Vec<String>,
}

#[derive(Template)]
#[template(path = "edit_profile.html")]
pub struct EditProfileTemplate {
    pub view: LayoutContext<EditProfileView>,
}

#[derive(Template)]
#[template(path = "about.html")]
pub struct AboutTemplate {
    pub view: LayoutContext<()>,
}

#[derive(Template)]
#[template(path = "rules.html")]
pub struct RulesTemplate {
    pub view: LayoutContext<()>,
}

pub struct ErrorPageView {
    pub title: String,
    pub message: String,
    pub primary_action: Option<ErrorAction>,
}

impl ErrorPageView {
    pub fn not_found() -> Self {
        Self {
            title: "Page Not Found".to_string(),
            message: "The page you requested does not exist or is not available yet."
                .to_string(),
            primary_action: Some(ErrorAction::home()),
        }
    }

    pub fn too_many_attempts(retry_after_secs: u64) -> Self {
        Self {
            title: "Too Many Attempts".to_string(),
            message: format!(
                "Too many failed sign-in attempts. Try again in {retry_after_secs} seconds."
            ),
            primary_action: Some(ErrorAction::home()),
        }
    }
}

pub struct ErrorAction {
    pub href: String,
    pub label: String,
}

impl ErrorAction {
    pub fn home() -> Self {
        Self {
            href: "/".to_string(),
            label: "Back to home".to_string(),
        }
    }
}

#[derive(Template)]
#[template(path = "error.html")]
pub struct ErrorTemplate {
    pub view: LayoutContext<ErrorPageView>,
}

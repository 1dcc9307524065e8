//! Fetching user details together with the book collection.

use apitest_core::{http::StatusCode, report, Verify};
use eyre::OptionExt;

use super::{ACCOUNT_KEY, BAD_TOKEN, BAD_USER_ID, DESIGNING_WEB_APIS, GIT_POCKET_GUIDE};
use crate::{
    data,
    fixture::Suite,
    services::{stage_book_cleanup, AccountService, BookService, UserPayload},
};

static SUITE: Suite = Suite::new("GetUserTest");

pub async fn run() -> usize {
    let results = [
        SUITE
            .test("get_user_successfully", get_user_successfully())
            .await,
        SUITE
            .test(
                "get_user_unsuccessfully_when_not_authorized",
                get_user_unsuccessfully_when_not_authorized(),
            )
            .await,
        SUITE
            .test(
                "get_user_unsuccessfully_with_invalid_user_id",
                get_user_unsuccessfully_with_invalid_user_id(),
            )
            .await,
    ];
    results.iter().filter(|result| result.is_err()).count()
}

async fn get_user_successfully() -> eyre::Result<()> {
    let account = data::account(ACCOUNT_KEY).ok_or_eyre("unknown account key")?;
    let isbns = [GIT_POCKET_GUIDE, DESIGNING_WEB_APIS];

    report::info("1. Get token")?;
    let accounts = AccountService::new()?;
    accounts.store_token(ACCOUNT_KEY, account).await?;
    let token = accounts
        .token(ACCOUNT_KEY)
        .ok_or_eyre("token missing after store_token")?;
    let books = BookService::new()?;

    report::info("2. Delete all books from collection before test")?;
    books.delete_all_books(&token, &account.user_id).await?;

    report::info("3. Add books to collection before test")?;
    books.add_books(&token, &account.user_id, &isbns).await?;
    for isbn in isbns {
        stage_book_cleanup(
            &SUITE.key("get_user_successfully"),
            &account.user_id,
            &token,
            isbn,
        );
    }

    report::info("4. Send request to get user")?;
    let response = accounts.get_user(&account.user_id, &token).await?;

    report::info("5. Verify status code is 200")?;
    response.expect_status(StatusCode::OK)?;

    report::info("6. Verify user name and user id are correct")?;
    let payload: UserPayload = response.json()?;
    eyre::ensure!(
        payload.username == account.user_name,
        "expected user name {}, got {}",
        account.user_name,
        payload.username
    );
    eyre::ensure!(
        payload.user_id == account.user_id,
        "expected user id {}, got {}",
        account.user_id,
        payload.user_id
    );

    report::info("7. Verify books are correct")?;
    eyre::ensure!(
        payload.books.len() == isbns.len(),
        "expected {} books, got {}",
        isbns.len(),
        payload.books.len()
    );
    for book in &payload.books {
        eyre::ensure!(
            isbns.contains(&book.isbn.as_str()),
            "unexpected book {} in collection",
            book.isbn
        );
    }

    report::info("8. Verify schema of the response")?;
    response.expect_schema(data::schema("get_user_response.json"))?;

    report::pass("user details verified")?;
    Ok(())
}

async fn get_user_unsuccessfully_when_not_authorized() -> eyre::Result<()> {
    let account = data::account(ACCOUNT_KEY).ok_or_eyre("unknown account key")?;

    report::info("1. Send request to get user with an invalid token")?;
    let accounts = AccountService::new()?;
    let response = accounts.get_user(&account.user_id, BAD_TOKEN).await?;

    report::info("2. Verify status code is 401")?;
    response.expect_status(StatusCode::UNAUTHORIZED)?;

    report::info("3. Verify message of response")?;
    response.expect_message("User not authorized!")?;

    report::pass("unauthorized lookup rejected")?;
    Ok(())
}

async fn get_user_unsuccessfully_with_invalid_user_id() -> eyre::Result<()> {
    let account = data::account(ACCOUNT_KEY).ok_or_eyre("unknown account key")?;

    report::info("1. Get token")?;
    let accounts = AccountService::new()?;
    accounts.store_token(ACCOUNT_KEY, account).await?;
    let token = accounts
        .token(ACCOUNT_KEY)
        .ok_or_eyre("token missing after store_token")?;

    report::info("2. Send request to get user with an invalid user id")?;
    let response = accounts.get_user(BAD_USER_ID, &token).await?;

    report::info("3. Verify status code is 401")?;
    response.expect_status(StatusCode::UNAUTHORIZED)?;

    report::info("4. Verify message of response")?;
    response.expect_message("User not found!")?;

    report::pass("unknown user id rejected")?;
    Ok(())
}

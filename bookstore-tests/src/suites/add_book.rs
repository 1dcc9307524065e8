//! Adding books to a user's collection.

use apitest_core::{http::StatusCode, report, Verify};
use eyre::OptionExt;

use super::{ACCOUNT_KEY, BAD_TOKEN, BAD_USER_ID, DESIGNING_WEB_APIS, GIT_POCKET_GUIDE, UNKNOWN_ISBN};
use crate::{
    data,
    fixture::Suite,
    services::{stage_book_cleanup, AccountService, BookService, BooksPayload},
};

static SUITE: Suite = Suite::new("AddBookTest");

pub async fn run() -> usize {
    let results = [
        SUITE
            .test("add_single_book_successfully", add_single_book_successfully())
            .await,
        SUITE
            .test(
                "add_multiple_books_successfully",
                add_multiple_books_successfully(),
            )
            .await,
        SUITE
            .test(
                "add_book_unsuccessfully_when_book_already_in_collection",
                add_book_unsuccessfully_when_book_already_in_collection(),
            )
            .await,
        SUITE
            .test(
                "add_books_unsuccessfully_with_invalid_isbn",
                add_books_unsuccessfully_with_invalid_isbn(),
            )
            .await,
        SUITE
            .test(
                "add_books_unsuccessfully_without_books",
                add_books_unsuccessfully_without_books(),
            )
            .await,
        SUITE
            .test(
                "add_books_unsuccessfully_when_not_authorized",
                add_books_unsuccessfully_when_not_authorized(),
            )
            .await,
        SUITE
            .test(
                "add_books_unsuccessfully_with_incorrect_user_id",
                add_books_unsuccessfully_with_incorrect_user_id(),
            )
            .await,
    ];
    results.iter().filter(|result| result.is_err()).count()
}

struct Context {
    account: &'static data::Account,
    token: String,
    books: BookService,
}

/// Resolve the account, generate a token and build the book service.
async fn setup() -> eyre::Result<Context> {
    let account = data::account(ACCOUNT_KEY).ok_or_eyre("unknown account key")?;

    report::info("1. Get token")?;
    let accounts = AccountService::new()?;
    accounts.store_token(ACCOUNT_KEY, account).await?;
    let token = accounts
        .token(ACCOUNT_KEY)
        .ok_or_eyre("token missing after store_token")?;

    Ok(Context {
        account,
        token,
        books: BookService::new()?,
    })
}

async fn add_single_book_successfully() -> eyre::Result<()> {
    let ctx = setup().await?;

    report::info("2. Clear book from collection before test")?;
    ctx.books
        .delete_book(&ctx.token, &ctx.account.user_id, GIT_POCKET_GUIDE)
        .await?;

    report::info("3. Send request to add book to collection")?;
    let response = ctx
        .books
        .add_books(&ctx.token, &ctx.account.user_id, &[GIT_POCKET_GUIDE])
        .await?;

    report::info("4. Stage new book for cleanup")?;
    stage_book_cleanup(
        &SUITE.key("add_single_book_successfully"),
        &ctx.account.user_id,
        &ctx.token,
        GIT_POCKET_GUIDE,
    );

    report::info("5. Verify that status code is 201")?;
    response.expect_status(StatusCode::CREATED)?;

    report::info("6. Verify schema of response")?;
    response.expect_schema(data::schema("add_books_response.json"))?;

    report::info("7. Verify that book is added correctly")?;
    let payload: BooksPayload = response.json()?;
    eyre::ensure!(
        payload.books[0].isbn == GIT_POCKET_GUIDE,
        "expected isbn {GIT_POCKET_GUIDE}, got {}",
        payload.books[0].isbn
    );

    report::pass("book added to collection")?;
    Ok(())
}

async fn add_multiple_books_successfully() -> eyre::Result<()> {
    let ctx = setup().await?;
    let isbns = [GIT_POCKET_GUIDE, DESIGNING_WEB_APIS];

    report::info("2. Clear books from collection before test")?;
    for isbn in isbns {
        ctx.books
            .delete_book(&ctx.token, &ctx.account.user_id, isbn)
            .await?;
    }

    report::info("3. Send request to add books to collection")?;
    let response = ctx
        .books
        .add_books(&ctx.token, &ctx.account.user_id, &isbns)
        .await?;

    report::info("4. Stage new books for cleanup")?;
    for isbn in isbns {
        stage_book_cleanup(
            &SUITE.key("add_multiple_books_successfully"),
            &ctx.account.user_id,
            &ctx.token,
            isbn,
        );
    }

    report::info("5. Verify that status code is 201")?;
    response.expect_status(StatusCode::CREATED)?;

    report::info("6. Verify schema of response")?;
    response.expect_schema(data::schema("add_books_response.json"))?;

    report::info("7. Verify that books are added correctly")?;
    let payload: BooksPayload = response.json()?;
    eyre::ensure!(
        payload.books.len() == isbns.len(),
        "expected {} books, got {}",
        isbns.len(),
        payload.books.len()
    );
    for (expected, actual) in isbns.iter().zip(&payload.books) {
        eyre::ensure!(
            &actual.isbn == expected,
            "expected isbn {expected}, got {}",
            actual.isbn
        );
    }

    report::pass("books added to collection")?;
    Ok(())
}

async fn add_book_unsuccessfully_when_book_already_in_collection() -> eyre::Result<()> {
    let ctx = setup().await?;

    report::info("2. Add book to collection the first time")?;
    ctx.books
        .add_books(&ctx.token, &ctx.account.user_id, &[GIT_POCKET_GUIDE])
        .await?;
    stage_book_cleanup(
        &SUITE.key("add_book_unsuccessfully_when_book_already_in_collection"),
        &ctx.account.user_id,
        &ctx.token,
        GIT_POCKET_GUIDE,
    );

    report::info("3. Add book to collection the second time")?;
    let response = ctx
        .books
        .add_books(&ctx.token, &ctx.account.user_id, &[GIT_POCKET_GUIDE])
        .await?;

    report::info("4. Verify that status code is 400")?;
    response.expect_status(StatusCode::BAD_REQUEST)?;

    report::info("5. Verify message of response")?;
    response.expect_message("ISBN already present in the User's Collection!")?;

    report::pass("duplicate add rejected")?;
    Ok(())
}

async fn add_books_unsuccessfully_with_invalid_isbn() -> eyre::Result<()> {
    let ctx = setup().await?;

    report::info("2. Send request to add books to collection")?;
    let response = ctx
        .books
        .add_books(&ctx.token, &ctx.account.user_id, &[UNKNOWN_ISBN])
        .await?;

    report::info("3. Verify that status code is 400")?;
    response.expect_status(StatusCode::BAD_REQUEST)?;

    report::info("4. Verify message of response")?;
    response.expect_message("ISBN supplied is not available in Books Collection!")?;

    report::pass("unknown isbn rejected")?;
    Ok(())
}

async fn add_books_unsuccessfully_without_books() -> eyre::Result<()> {
    let ctx = setup().await?;

    report::info("2. Send request to add an empty book list")?;
    let response = ctx
        .books
        .add_books(&ctx.token, &ctx.account.user_id, &[])
        .await?;

    report::info("3. Verify that status code is 400")?;
    response.expect_status(StatusCode::BAD_REQUEST)?;

    report::info("4. Verify message of response")?;
    response.expect_message("Collection of books required.")?;

    report::pass("empty book list rejected")?;
    Ok(())
}

async fn add_books_unsuccessfully_when_not_authorized() -> eyre::Result<()> {
    let ctx = setup().await?;

    report::info("2. Send request to add books with an invalid token")?;
    let response = ctx
        .books
        .add_books(BAD_TOKEN, &ctx.account.user_id, &[UNKNOWN_ISBN])
        .await?;

    report::info("3. Verify that status code is 401")?;
    response.expect_status(StatusCode::UNAUTHORIZED)?;

    report::info("4. Verify message of response")?;
    response.expect_message("User not authorized!")?;

    report::pass("unauthorized add rejected")?;
    Ok(())
}

async fn add_books_unsuccessfully_with_incorrect_user_id() -> eyre::Result<()> {
    let ctx = setup().await?;

    report::info("2. Send request to add books with an incorrect user id")?;
    let response = ctx
        .books
        .add_books(&ctx.token, BAD_USER_ID, &[UNKNOWN_ISBN])
        .await?;

    report::info("3. Verify that status code is 401")?;
    response.expect_status(StatusCode::UNAUTHORIZED)?;

    report::info("4. Verify message of response")?;
    response.expect_message("User Id not correct!")?;

    report::pass("incorrect user id rejected")?;
    Ok(())
}

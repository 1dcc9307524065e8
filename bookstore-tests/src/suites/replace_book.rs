//! Replacing a book in a user's collection with another one.

use apitest_core::{http::StatusCode, report, Verify};
use eyre::OptionExt;

use super::{ACCOUNT_KEY, BAD_TOKEN, BAD_USER_ID, DESIGNING_WEB_APIS, GIT_POCKET_GUIDE};
use crate::{
    data,
    fixture::Suite,
    services::{stage_book_cleanup, AccountService, BookService, BooksPayload},
};

static SUITE: Suite = Suite::new("ReplaceBookTest");

pub async fn run() -> usize {
    let results = [
        SUITE
            .test("replace_book_successfully", replace_book_successfully())
            .await,
        SUITE
            .test(
                "replace_book_unsuccessfully_when_old_isbn_not_in_collection",
                replace_book_unsuccessfully_when_old_isbn_not_in_collection(),
            )
            .await,
        SUITE
            .test(
                "replace_book_unsuccessfully_when_new_isbn_not_in_store",
                replace_book_unsuccessfully_when_new_isbn_not_in_store(),
            )
            .await,
        SUITE
            .test(
                "replace_book_unsuccessfully_when_not_authorized",
                replace_book_unsuccessfully_when_not_authorized(),
            )
            .await,
        SUITE
            .test(
                "replace_book_unsuccessfully_with_incorrect_user_id",
                replace_book_unsuccessfully_with_incorrect_user_id(),
            )
            .await,
        SUITE
            .test(
                "replace_book_unsuccessfully_when_missing_new_isbn",
                replace_book_unsuccessfully_when_missing_new_isbn(),
            )
            .await,
        SUITE
            .test(
                "replace_book_unsuccessfully_when_new_isbn_already_in_collection",
                replace_book_unsuccessfully_when_new_isbn_already_in_collection(),
            )
            .await,
        SUITE
            .test(
                "replace_book_unsuccessfully_when_new_isbn_equals_old_isbn",
                replace_book_unsuccessfully_when_new_isbn_equals_old_isbn(),
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

impl Context {
    /// Add `isbn` to the collection and stage it for teardown deletion.
    async fn seed_book(&self, test_name: &str, isbn: &str) -> eyre::Result<()> {
        self.books
            .add_books(&self.token, &self.account.user_id, &[isbn])
            .await?;
        stage_book_cleanup(
            &SUITE.key(test_name),
            &self.account.user_id,
            &self.token,
            isbn,
        );
        Ok(())
    }
}

async fn replace_book_successfully() -> eyre::Result<()> {
    let ctx = setup().await?;

    report::info("2. Add old book to collection before test")?;
    ctx.seed_book("replace_book_successfully", GIT_POCKET_GUIDE)
        .await?;

    report::info("3. Send request to replace book in collection")?;
    let response = ctx
        .books
        .replace_book(
            &ctx.token,
            &ctx.account.user_id,
            GIT_POCKET_GUIDE,
            DESIGNING_WEB_APIS,
        )
        .await?;

    report::info("4. Stage new book for cleanup")?;
    stage_book_cleanup(
        &SUITE.key("replace_book_successfully"),
        &ctx.account.user_id,
        &ctx.token,
        DESIGNING_WEB_APIS,
    );

    report::info("5. Verify that status code is 200")?;
    response.expect_status(StatusCode::OK)?;

    report::info("6. Verify that new book replaced the old one")?;
    let payload: BooksPayload = response.json()?;
    eyre::ensure!(
        payload.books[0].isbn == DESIGNING_WEB_APIS,
        "expected isbn {DESIGNING_WEB_APIS}, got {}",
        payload.books[0].isbn
    );

    report::info("7. Verify schema of the response")?;
    response.expect_schema(data::schema("replace_book_response.json"))?;

    report::pass("book replaced in collection")?;
    Ok(())
}

async fn replace_book_unsuccessfully_when_old_isbn_not_in_collection() -> eyre::Result<()> {
    let ctx = setup().await?;

    report::info("2. Delete old book from collection")?;
    ctx.books
        .delete_book(&ctx.token, &ctx.account.user_id, GIT_POCKET_GUIDE)
        .await?;

    report::info("3. Send request to replace book in collection")?;
    let response = ctx
        .books
        .replace_book(
            &ctx.token,
            &ctx.account.user_id,
            GIT_POCKET_GUIDE,
            DESIGNING_WEB_APIS,
        )
        .await?;

    report::info("4. Verify that status code is 400")?;
    response.expect_status(StatusCode::BAD_REQUEST)?;

    report::info("5. Verify message of response")?;
    response.expect_message("ISBN supplied is not available in User's Collection!")?;

    report::pass("replace of absent book rejected")?;
    Ok(())
}

async fn replace_book_unsuccessfully_when_new_isbn_not_in_store() -> eyre::Result<()> {
    let ctx = setup().await?;

    report::info("2. Add old book to collection before test")?;
    ctx.seed_book(
        "replace_book_unsuccessfully_when_new_isbn_not_in_store",
        GIT_POCKET_GUIDE,
    )
    .await?;

    report::info("3. Send request to replace book with an unknown isbn")?;
    let response = ctx
        .books
        .replace_book(&ctx.token, &ctx.account.user_id, GIT_POCKET_GUIDE, "abcd")
        .await?;

    report::info("4. Verify that status code is 400")?;
    response.expect_status(StatusCode::BAD_REQUEST)?;

    report::info("5. Verify message of response")?;
    response.expect_message("ISBN supplied is not available in Books Collection!")?;

    report::pass("replace with unknown isbn rejected")?;
    Ok(())
}

async fn replace_book_unsuccessfully_when_not_authorized() -> eyre::Result<()> {
    let ctx = setup().await?;

    report::info("2. Add old book to collection before test")?;
    ctx.seed_book(
        "replace_book_unsuccessfully_when_not_authorized",
        GIT_POCKET_GUIDE,
    )
    .await?;

    report::info("3. Send request to replace book with an invalid token")?;
    let response = ctx
        .books
        .replace_book(
            BAD_TOKEN,
            &ctx.account.user_id,
            GIT_POCKET_GUIDE,
            DESIGNING_WEB_APIS,
        )
        .await?;

    report::info("4. Verify that status code is 401")?;
    response.expect_status(StatusCode::UNAUTHORIZED)?;

    report::info("5. Verify message of response")?;
    response.expect_message("User not authorized!")?;

    report::pass("unauthorized replace rejected")?;
    Ok(())
}

async fn replace_book_unsuccessfully_with_incorrect_user_id() -> eyre::Result<()> {
    let ctx = setup().await?;

    report::info("2. Add old book to collection before test")?;
    ctx.seed_book(
        "replace_book_unsuccessfully_with_incorrect_user_id",
        GIT_POCKET_GUIDE,
    )
    .await?;

    report::info("3. Send request to replace book with an incorrect user id")?;
    let response = ctx
        .books
        .replace_book(&ctx.token, BAD_USER_ID, GIT_POCKET_GUIDE, DESIGNING_WEB_APIS)
        .await?;

    report::info("4. Verify that status code is 401")?;
    response.expect_status(StatusCode::UNAUTHORIZED)?;

    report::info("5. Verify message of response")?;
    response.expect_message("User Id not correct!")?;

    report::pass("replace with incorrect user id rejected")?;
    Ok(())
}

async fn replace_book_unsuccessfully_when_missing_new_isbn() -> eyre::Result<()> {
    let ctx = setup().await?;

    report::info("2. Add old book to collection before test")?;
    ctx.seed_book(
        "replace_book_unsuccessfully_when_missing_new_isbn",
        GIT_POCKET_GUIDE,
    )
    .await?;

    report::info("3. Send request to replace book with an empty new isbn")?;
    let response = ctx
        .books
        .replace_book(&ctx.token, &ctx.account.user_id, GIT_POCKET_GUIDE, "")
        .await?;

    report::info("4. Verify that status code is 400")?;
    response.expect_status(StatusCode::BAD_REQUEST)?;

    report::info("5. Verify message of response")?;
    response.expect_message("Request Body is Invalid!")?;

    report::pass("replace without new isbn rejected")?;
    Ok(())
}

async fn replace_book_unsuccessfully_when_new_isbn_already_in_collection() -> eyre::Result<()> {
    let ctx = setup().await?;

    report::info("2. Add old book to collection before test")?;
    ctx.seed_book(
        "replace_book_unsuccessfully_when_new_isbn_already_in_collection",
        GIT_POCKET_GUIDE,
    )
    .await?;

    report::info("3. Add new book to collection before test")?;
    ctx.seed_book(
        "replace_book_unsuccessfully_when_new_isbn_already_in_collection",
        DESIGNING_WEB_APIS,
    )
    .await?;

    report::info("4. Send request to replace book in collection")?;
    let response = ctx
        .books
        .replace_book(
            &ctx.token,
            &ctx.account.user_id,
            GIT_POCKET_GUIDE,
            DESIGNING_WEB_APIS,
        )
        .await?;

    report::info("5. Verify that status code is 400")?;
    response.expect_status(StatusCode::BAD_REQUEST)?;

    report::info("6. Verify message of response")?;
    response.expect_message("ISBN already present in the User's Collection!")?;

    report::pass("replace onto present book rejected")?;
    Ok(())
}

async fn replace_book_unsuccessfully_when_new_isbn_equals_old_isbn() -> eyre::Result<()> {
    let ctx = setup().await?;

    report::info("2. Add old book to collection before test")?;
    ctx.seed_book(
        "replace_book_unsuccessfully_when_new_isbn_equals_old_isbn",
        GIT_POCKET_GUIDE,
    )
    .await?;

    report::info("3. Send request to replace book with itself")?;
    let response = ctx
        .books
        .replace_book(
            &ctx.token,
            &ctx.account.user_id,
            GIT_POCKET_GUIDE,
            GIT_POCKET_GUIDE,
        )
        .await?;

    report::info("4. Verify that status code is 400")?;
    response.expect_status(StatusCode::BAD_REQUEST)?;

    report::info("5. Verify message of response")?;
    response.expect_message("ISBN already present in the User's Collection!")?;

    report::pass("replace with identical isbn rejected")?;
    Ok(())
}

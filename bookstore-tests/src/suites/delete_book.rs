//! Deleting books from a user's collection.

use apitest_core::{http::StatusCode, report, Verify};
use eyre::OptionExt;

use super::{ACCOUNT_KEY, BAD_TOKEN, BAD_USER_ID, GIT_POCKET_GUIDE};
use crate::{
    data,
    fixture::Suite,
    services::{stage_book_cleanup, AccountService, BookService, UserPayload},
};

static SUITE: Suite = Suite::new("DeleteBookTest");

pub async fn run() -> usize {
    let results = [
        SUITE
            .test("delete_book_successfully", delete_book_successfully())
            .await,
        SUITE
            .test(
                "delete_book_unsuccessfully_when_book_not_in_collection",
                delete_book_unsuccessfully_when_book_not_in_collection(),
            )
            .await,
        SUITE
            .test(
                "delete_book_unsuccessfully_when_missing_isbn",
                delete_book_unsuccessfully_when_missing_isbn(),
            )
            .await,
        SUITE
            .test(
                "delete_book_unsuccessfully_when_not_authorized",
                delete_book_unsuccessfully_when_not_authorized(),
            )
            .await,
        SUITE
            .test(
                "delete_book_unsuccessfully_with_incorrect_user_id",
                delete_book_unsuccessfully_with_incorrect_user_id(),
            )
            .await,
    ];
    results.iter().filter(|result| result.is_err()).count()
}

struct Context {
    account: &'static data::Account,
    token: String,
    accounts: AccountService,
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
        accounts,
        books: BookService::new()?,
    })
}

async fn delete_book_successfully() -> eyre::Result<()> {
    let ctx = setup().await?;

    report::info("2. Add book to collection before test")?;
    ctx.books
        .add_books(&ctx.token, &ctx.account.user_id, &[GIT_POCKET_GUIDE])
        .await?;

    report::info("3. Send request to delete book from collection")?;
    let response = ctx
        .books
        .delete_book(&ctx.token, &ctx.account.user_id, GIT_POCKET_GUIDE)
        .await?;

    report::info("4. Verify that status code is 204")?;
    response.expect_status(StatusCode::NO_CONTENT)?;

    report::info("5. Verify that collection no longer contains the book")?;
    let user = ctx
        .accounts
        .get_user(&ctx.account.user_id, &ctx.token)
        .await?;
    let payload: UserPayload = user.json()?;
    eyre::ensure!(
        payload.books.iter().all(|book| book.isbn != GIT_POCKET_GUIDE),
        "book {GIT_POCKET_GUIDE} still present after delete"
    );

    report::pass("book deleted from collection")?;
    Ok(())
}

async fn delete_book_unsuccessfully_when_book_not_in_collection() -> eyre::Result<()> {
    let ctx = setup().await?;

    report::info("2. Send request to delete a book that is not in the collection")?;
    let response = ctx
        .books
        .delete_book(&ctx.token, &ctx.account.user_id, "abcd")
        .await?;

    report::info("3. Verify that status code is 400")?;
    response.expect_status(StatusCode::BAD_REQUEST)?;

    report::info("4. Verify message of response")?;
    response.expect_message("ISBN supplied is not available in User's Collection!")?;

    report::pass("delete of absent book rejected")?;
    Ok(())
}

async fn delete_book_unsuccessfully_when_missing_isbn() -> eyre::Result<()> {
    let ctx = setup().await?;

    report::info("2. Send request to delete with an empty isbn")?;
    let response = ctx
        .books
        .delete_book(&ctx.token, &ctx.account.user_id, "")
        .await?;

    report::info("3. Verify that status code is 400")?;
    response.expect_status(StatusCode::BAD_REQUEST)?;

    report::info("4. Verify message of response")?;
    response.expect_message("ISBN supplied is not available in User's Collection!")?;

    report::pass("delete without isbn rejected")?;
    Ok(())
}

async fn delete_book_unsuccessfully_when_not_authorized() -> eyre::Result<()> {
    let ctx = setup().await?;

    report::info("2. Add book to collection before test")?;
    ctx.books
        .add_books(&ctx.token, &ctx.account.user_id, &[GIT_POCKET_GUIDE])
        .await?;
    stage_book_cleanup(
        &SUITE.key("delete_book_unsuccessfully_when_not_authorized"),
        &ctx.account.user_id,
        &ctx.token,
        GIT_POCKET_GUIDE,
    );

    report::info("3. Send request to delete book with an invalid token")?;
    let response = ctx
        .books
        .delete_book(BAD_TOKEN, &ctx.account.user_id, GIT_POCKET_GUIDE)
        .await?;

    report::info("4. Verify that status code is 401")?;
    response.expect_status(StatusCode::UNAUTHORIZED)?;

    report::info("5. Verify message of response")?;
    response.expect_message("User not authorized!")?;

    report::pass("unauthorized delete rejected")?;
    Ok(())
}

async fn delete_book_unsuccessfully_with_incorrect_user_id() -> eyre::Result<()> {
    let ctx = setup().await?;

    report::info("2. Add book to collection before test")?;
    ctx.books
        .add_books(&ctx.token, &ctx.account.user_id, &[GIT_POCKET_GUIDE])
        .await?;
    stage_book_cleanup(
        &SUITE.key("delete_book_unsuccessfully_with_incorrect_user_id"),
        &ctx.account.user_id,
        &ctx.token,
        GIT_POCKET_GUIDE,
    );

    report::info("3. Send request to delete book with an incorrect user id")?;
    let response = ctx
        .books
        .delete_book(&ctx.token, BAD_USER_ID, GIT_POCKET_GUIDE)
        .await?;

    report::info("4. Verify that status code is 401")?;
    response.expect_status(StatusCode::UNAUTHORIZED)?;

    report::info("5. Verify message of response")?;
    response.expect_message("User Id not correct!")?;

    report::pass("delete with incorrect user id rejected")?;
    Ok(())
}

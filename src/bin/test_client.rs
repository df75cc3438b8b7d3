use futures::{SinkExt, StreamExt};
use liars_table::data::{
    ClientMessage, CreateGameRequest, CreateGameResponse, JoinGameRequest, JoinGameResponse,
};
use tokio_tungstenite::{connect_async, tungstenite::protocol::Message};

/// Connects a socket, announces into the game, then plays a fixed script
/// of commands while printing everything the server pushes back.
fn spawn_game_connection(
    name: &'static str,
    announce: ClientMessage,
    script: Vec<(u64, ClientMessage)>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let (ws_stream, _) = connect_async("ws://127.0.0.1:3000/ws")
            .await
            .expect("failed to connect");
        let (mut write, mut read) = ws_stream.split();

        println!("....[{name}] Connected!");

        let json = serde_json::to_string(&announce).unwrap();
        write
            .send(Message::Text(json.into()))
            .await
            .expect("failed to announce");

        for (delay_secs, msg) in script {
            tokio::time::sleep(tokio::time::Duration::from_secs(delay_secs)).await;
            let json = serde_json::to_string(&msg).unwrap();
            println!("....[{name} TX] {json}");
            write
                .send(Message::Text(json.into()))
                .await
                .expect("failed to send command");
        }

        while let Some(msg) = read.next().await {
            let msg = msg.expect("Error reading message");
            if msg.is_text() {
                println!("....[{name} RX] {}", msg.to_text().unwrap());
            }
        }
    })
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let client = reqwest::Client::new();
    let base_url = "http://127.0.0.1:3000";

    println!("--- 🃏 LIAR'S TABLE TEST CLIENT ---");

    println!("\n[1] Creating Game...");
    let created = client
        .post(format!("{}/game", base_url))
        .json(&CreateGameRequest { host_name: "Alice".to_string() })
        .send()
        .await?
        .json::<CreateGameResponse>()
        .await?;

    let game_id = created.session.get_id().clone();
    let alice_id = created.host_player_id;
    let alice_card = created
        .session
        .get_player(alice_id)
        .expect("host is in the session")
        .get_hand()[0]
        .id;
    println!("Success! Game ID: {game_id}  Alice: {alice_id}");

    println!("\n[2] Bob Joining...");
    let joined = client
        .post(format!("{}/game/{}/join", base_url, game_id))
        .json(&JoinGameRequest { player_name: "Bob".to_string() })
        .send()
        .await?
        .json::<JoinGameResponse>()
        .await?;
    let bob_id = joined.player_id;
    println!("Success! Bob: {bob_id}");

    println!("\n[3] Connecting WebSockets...");
    // Alice plays a card, Bob accuses her, Alice closes the revelation.
    let alice_handle = spawn_game_connection(
        "Alice",
        ClientMessage::JoinGame { game_id: game_id.clone(), player_id: alice_id },
        vec![
            (2, ClientMessage::PlayCard { card_id: alice_card }),
            (6, ClientMessage::ContinueGame),
        ],
    );
    let bob_handle = spawn_game_connection(
        "Bob",
        ClientMessage::JoinGame { game_id: game_id.clone(), player_id: bob_id },
        vec![(4, ClientMessage::Accuse { accused_player_id: alice_id })],
    );

    let _ = tokio::join!(alice_handle, bob_handle);

    Ok(())
}
